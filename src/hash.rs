//! Hashing helpers shared by the element derivation and the session.

use alloc::vec;
use alloc::vec::Vec;

use hmac_sha256::Hash;
use hmac_sha512::HMAC;
use num_bigint::BigUint;
use num_traits::Zero;
use zeroize::Zeroizing;

/// Output length of `H` in bytes.
pub const HASH_BYTES: usize = 32;

/// `H(parts[0] || parts[1] || ...)` with SHA-256.
pub(crate) fn hash_concat(parts: &[&[u8]]) -> [u8; HASH_BYTES] {
    let mut st = Hash::new();
    for part in parts {
        st.update(part);
    }
    st.finalize()
}

/// Big-endian encoding of `x`, left-padded with zeros to `len` bytes.
pub(crate) fn to_fixed_be(x: &BigUint, len: usize) -> Zeroizing<Vec<u8>> {
    let bytes = Zeroizing::new(x.to_bytes_be());
    let mut out = Zeroizing::new(vec![0u8; len.max(bytes.len())]);
    let offset = out.len() - bytes.len();
    out[offset..].copy_from_slice(&bytes);
    out
}

/// Overwrites the limbs of a secret integer in place and leaves it zero.
///
/// `BigUint` has no zeroize hook; `assign_from_slice` refills the existing
/// allocation, so the freed buffer only ever holds ones.
pub(crate) fn scrub(x: &mut BigUint) {
    let digits = ((x.bits() + 31) / 32) as usize;
    x.assign_from_slice(&vec![u32::MAX; digits.max(1)]);
    x.set_zero();
}

/// Deterministically expands `base` into an integer of at most `bits` bits.
///
/// HMAC-SHA-512 in counter mode, keyed with `base`:
/// `T_i = HMAC(base, i || label || bits)` with `i` and `bits` as big-endian
/// `u16`. The blocks are concatenated, cut to `ceil(bits / 8)` bytes and the
/// surplus leading bits are cleared, so the first output bit is the most
/// significant bit of the result.
pub(crate) fn expand(base: &[u8], label: &[u8], bits: usize) -> BigUint {
    debug_assert!(bits <= u16::MAX as usize);
    let len = (bits + 7) / 8;
    let mut out = Zeroizing::new(Vec::with_capacity(len + hmac_sha512::BLOCKBYTES));
    let mut i: u16 = 1;
    while out.len() < len {
        let mut mac = HMAC::new(base);
        mac.update(i.to_be_bytes());
        mac.update(label);
        mac.update((bits as u16).to_be_bytes());
        out.extend_from_slice(&mac.finalize());
        i = i.wrapping_add(1);
    }
    out.truncate(len);
    let surplus = len * 8 - bits;
    if surplus > 0 {
        out[0] &= 0xff >> surplus;
    }
    BigUint::from_bytes_be(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_encoding() {
        assert_eq!(&to_fixed_be(&BigUint::from(0x0102u32), 4)[..], &[0, 0, 1, 2]);
        assert_eq!(&to_fixed_be(&BigUint::from(0u32), 2)[..], &[0, 0]);
        assert_eq!(&to_fixed_be(&BigUint::from(0x0102u32), 1)[..], &[1, 2]);
    }

    #[test]
    fn expansion_respects_bit_length() {
        for &bits in &[1usize, 7, 8, 9, 69, 320, 513, 1100] {
            let v = expand(b"base", b"label", bits);
            assert!(v.bits() as usize <= bits, "bits = {}", bits);
        }
    }

    #[test]
    fn expansion_is_deterministic_and_label_bound() {
        let a = expand(b"base", b"label", 320);
        assert_eq!(a, expand(b"base", b"label", 320));
        assert_ne!(a, expand(b"base", b"other label", 320));
        assert_ne!(a, expand(b"other base", b"label", 320));
    }

    #[test]
    fn scrub_leaves_zero() {
        let mut x = BigUint::from_bytes_be(&[0xa5; 40]);
        scrub(&mut x);
        assert!(x.is_zero());
        let mut small = BigUint::from(7u8);
        scrub(&mut small);
        assert!(small.is_zero());
    }

    #[test]
    fn hash_concat_matches_single_update() {
        assert_eq!(hash_concat(&[b"ab", b"c"]), Hash::hash(b"abc"));
    }
}
