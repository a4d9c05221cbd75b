//! Arithmetic in the prime field `GF(p)`.
//!
//! All inputs are reduced modulo `p` first, so callers may pass unreduced
//! integers. `p` is assumed to be an odd prime.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::Error;

/// Inverse of `x` modulo `p` via Fermat's little theorem, `x^(p-2) mod p`.
pub fn mod_inverse(x: &BigUint, p: &BigUint) -> Result<BigUint, Error> {
    let x = x % p;
    if x.is_zero() {
        return Err(Error::DivisionByZero);
    }
    let two = BigUint::from(2u8);
    Ok(x.modpow(&(p - &two), p))
}

/// Legendre symbol of `v`, as `v^((p-1)/2) mod p`: `1`, `0` or `p - 1`.
pub(crate) fn legendre(v: &BigUint, p: &BigUint) -> BigUint {
    let exponent = (p - &BigUint::one()) >> 1u32;
    v.modpow(&exponent, p)
}

/// Euler's criterion. Zero is not a residue.
pub fn is_quadratic_residue(v: &BigUint, p: &BigUint) -> bool {
    legendre(&(v % p), p).is_one()
}

/// A square root of `n` modulo `p` (Tonelli-Shanks).
///
/// The other root is `p - r`. Returns `None` when `n` turns out not to be a
/// square, which callers are expected to have ruled out already.
pub fn sqrt_mod_p(n: &BigUint, p: &BigUint) -> Option<BigUint> {
    let n = n % p;
    if n.is_zero() {
        return Some(n);
    }
    let one = BigUint::one();
    let p_minus_one = p - &one;

    let r = if p % &BigUint::from(4u8) == BigUint::from(3u8) {
        n.modpow(&((p + &one) >> 2u32), p)
    } else {
        tonelli_shanks(&n, p, &p_minus_one)
    };

    if (&r * &r) % p == n {
        Some(r)
    } else {
        None
    }
}

fn tonelli_shanks(n: &BigUint, p: &BigUint, p_minus_one: &BigUint) -> BigUint {
    let one = BigUint::one();

    // p - 1 = q * 2^s with q odd
    let s = p_minus_one.trailing_zeros().unwrap_or(0);
    let q = p_minus_one >> s;

    let mut z = BigUint::from(2u8);
    while &z < p && &legendre(&z, p) != p_minus_one {
        z += 1u32;
    }

    let mut m = s;
    let mut c = z.modpow(&q, p);
    let mut t = n.modpow(&q, p);
    let mut r = n.modpow(&((&q + &one) >> 1u32), p);

    while !t.is_one() {
        // least i in (0, m) with t^(2^i) == 1
        let mut i = 0u64;
        let mut t2 = t.clone();
        while !t2.is_one() {
            t2 = (&t2 * &t2) % p;
            i += 1;
            if i == m {
                // n is not a square; the caller's final check rejects r
                return r;
            }
        }
        let b = c.modpow(&(BigUint::one() << (m - i - 1)), p);
        r = (&r * &b) % p;
        c = (&b * &b) % p;
        t = (&t * &c) % p;
        m = i;
    }
    r
}
