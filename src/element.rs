//! Hunting and pecking: mapping a password onto a curve point.
//!
//! Both peers order their identifiers the same way before hashing, so the
//! resulting password element does not depend on who initiated.

use alloc::vec;

use num_bigint::BigUint;
use subtle::{Choice, ConditionallySelectable, ConstantTimeLess};
use zeroize::Zeroizing;

use crate::curve::{CurveParameters, Point};
use crate::field::{is_quadratic_residue, sqrt_mod_p};
use crate::hash::{expand, hash_concat, to_fixed_be, HASH_BYTES};
use crate::Error;

/// Default number of hunting-and-pecking iterations.
pub const DEFAULT_ITERATIONS: u8 = 40;

const HUNTING_AND_PECKING_LABEL: &[u8] = b"Dragonfly Hunting And Pecking";

/// Number of valid candidates after which the selected x-coordinate stops
/// moving.
const CANDIDATES: u8 = 5;

/// Derives the password element for `password` shared between `id_a` and
/// `id_b`.
///
/// Every one of the `iterations` rounds is executed and the candidate is
/// picked with constant-time selects: the 5th quadratic-residue candidate
/// wins, or the last one if fewer were found.
pub fn derive_password_element(
    curve: &CurveParameters,
    password: impl AsRef<[u8]>,
    id_a: impl AsRef<[u8]>,
    id_b: impl AsRef<[u8]>,
    iterations: u8,
) -> Result<Point, Error> {
    let (id_a, id_b) = (id_a.as_ref(), id_b.as_ref());
    if id_a.len() > 0xff || id_b.len() > 0xff {
        return Err(Error::Overflow(
            "Identifiers must be at most 255 bytes long",
        ));
    }
    let (max_id, min_id) = if id_a >= id_b { (id_a, id_b) } else { (id_b, id_a) };

    let p = curve.p();
    let one = BigUint::from(1u8);
    let p_minus_one = p - &one;
    let bits = p.bits() as usize + 64;
    let len = curve.field_len();

    let mut x = Zeroizing::new(vec![0u8; len]);
    let mut found: u8 = 0;
    for counter in 1..=iterations {
        let base = Zeroizing::new(hashed_password(max_id, min_id, password.as_ref(), counter));
        let seed = (expand(&base[..], HUNTING_AND_PECKING_LABEL, bits) % &p_minus_one) + &one;
        let is_residue = Choice::from(is_quadratic_residue(&curve.rhs(&seed), p) as u8);
        let seed = to_fixed_be(&seed, len);

        let take = is_residue & found.ct_lt(&CANDIDATES);
        for (dst, src) in x.iter_mut().zip(seed.iter()) {
            dst.conditional_assign(src, take);
        }
        found = u8::conditional_select(&found, &found.wrapping_add(1), is_residue);
    }

    if found == 0 {
        log::warn!("no password element after {} iterations", iterations);
        return Err(Error::DerivationFailure { iterations });
    }
    log::debug!(
        "password element found, {} candidates in {} iterations",
        found,
        iterations
    );

    let x = BigUint::from_bytes_be(&x[..]);
    let y = sqrt_mod_p(&curve.rhs(&x), p).ok_or(Error::InvalidPoint)?;
    let pe = Point::affine(x, y);
    if !curve.is_valid(&pe) {
        return Err(Error::InvalidPoint);
    }
    Ok(pe)
}

/// `H(len(max_id) || max_id || len(min_id) || min_id || password || counter)`
fn hashed_password(
    max_id: &[u8],
    min_id: &[u8],
    password: &[u8],
    counter: u8,
) -> [u8; HASH_BYTES] {
    hash_concat(&[
        &[max_id.len() as u8],
        max_id,
        &[min_id.len() as u8],
        min_id,
        password,
        &[counter],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Branching reference of the selection rule.
    fn reference_x(
        curve: &CurveParameters,
        password: &[u8],
        max_id: &[u8],
        min_id: &[u8],
        k: u8,
    ) -> Option<BigUint> {
        let p = curve.p();
        let p_minus_one = p - BigUint::from(1u8);
        let mut seen = 0;
        let mut x = None;
        for counter in 1..=k {
            let base = hashed_password(max_id, min_id, password, counter);
            let bits = p.bits() as usize + 64;
            let seed = (expand(&base, HUNTING_AND_PECKING_LABEL, bits) % &p_minus_one) + 1u32;
            if is_quadratic_residue(&curve.rhs(&seed), p) && seen < 5 {
                x = Some(seed);
                seen += 1;
            }
        }
        x
    }

    #[test]
    fn identity_order_does_not_matter() {
        let curve = CurveParameters::brainpool_p256r1();
        let a = derive_password_element(&curve, "secret", "AA:AA", "BB:BB", 40).unwrap();
        let b = derive_password_element(&curve, "secret", "BB:BB", "AA:AA", 40).unwrap();
        assert_eq!(a, b);
        assert!(curve.is_valid(&a));
    }

    #[test]
    fn depends_on_password() {
        let curve = CurveParameters::brainpool_p256r1();
        let a = derive_password_element(&curve, "secret", "AA:AA", "BB:BB", 40).unwrap();
        let b = derive_password_element(&curve, "Secret", "AA:AA", "BB:BB", 40).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn selects_fifth_or_last_candidate() {
        let curve = CurveParameters::toy();
        for k in [1u8, 2, 3, 5, 8, 13, 40] {
            let expected = reference_x(&curve, b"pw", b"BB:BB", b"AA:AA", k);
            match derive_password_element(&curve, "pw", "AA:AA", "BB:BB", k) {
                Ok(pe) => assert_eq!(pe.x(), expected.as_ref(), "k = {}", k),
                Err(Error::DerivationFailure { iterations }) => {
                    assert_eq!(iterations, k);
                    assert!(expected.is_none());
                }
                Err(e) => panic!("unexpected error {:?}", e),
            }
        }
    }

    #[test]
    fn toy_curve_element_is_valid() {
        let curve = CurveParameters::toy();
        let pe = derive_password_element(&curve, "pw", "AA:AA", "BB:BB", DEFAULT_ITERATIONS).unwrap();
        assert!(curve.is_valid(&pe));
        assert!(!pe.is_identity());
    }

    #[test]
    fn zero_iterations_fail() {
        let curve = CurveParameters::toy();
        assert!(matches!(
            derive_password_element(&curve, "pw", "AA:AA", "BB:BB", 0),
            Err(Error::DerivationFailure { iterations: 0 })
        ));
    }

    #[test]
    fn long_identifiers_overflow() {
        let curve = CurveParameters::toy();
        let long = [b'x'; 256];
        assert!(matches!(
            derive_password_element(&curve, "pw", &long[..], "BB:BB", 40),
            Err(Error::Overflow(_))
        ));
    }
}
