//! Short-Weierstrass curves `y^2 = x^3 + ax + b` over `GF(p)` and their
//! group law in affine coordinates.

use hex_literal::hex;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::field::mod_inverse;
use crate::Error;

/// Largest accepted field modulus, in bits. Keeps the expansion length
/// within its 16-bit encoding.
pub const MAX_FIELD_BITS: u64 = 8192;

/// A point on the curve, or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Point {
    /// The point at infinity, neutral element of the group.
    Identity,
    /// A finite point. Coordinates are expected to be reduced modulo `p`.
    Affine {
        /// x-coordinate.
        x: BigUint,
        /// y-coordinate.
        y: BigUint,
    },
}

impl Point {
    /// Builds a finite point without checking that it lies on any curve.
    pub fn affine(x: BigUint, y: BigUint) -> Self {
        Point::Affine { x, y }
    }

    /// The x-coordinate, if this is a finite point.
    pub fn x(&self) -> Option<&BigUint> {
        match self {
            Point::Identity => None,
            Point::Affine { x, .. } => Some(x),
        }
    }

    /// The y-coordinate, if this is a finite point.
    pub fn y(&self) -> Option<&BigUint> {
        match self {
            Point::Identity => None,
            Point::Affine { y, .. } => Some(y),
        }
    }

    /// Returns `true` for the point at infinity.
    pub fn is_identity(&self) -> bool {
        matches!(self, Point::Identity)
    }
}

/// Domain parameters `{a, b, p, q}` of a prime-field curve.
///
/// `p` is the field modulus and `q` the prime order of the subgroup the
/// password element lives in. Both are assumed prime; only cheap structural
/// checks are made at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveParameters {
    a: BigUint,
    b: BigUint,
    p: BigUint,
    q: BigUint,
}

impl CurveParameters {
    /// Creates a curve from its parameters.
    pub fn new(a: BigUint, b: BigUint, p: BigUint, q: BigUint) -> Result<Self, Error> {
        if p <= BigUint::from(3u8) || !p.bit(0) {
            return Err(Error::InvalidParameters("p must be an odd prime above 3"));
        }
        if p.bits() > MAX_FIELD_BITS {
            return Err(Error::InvalidParameters("p is too large"));
        }
        if a >= p || b >= p {
            return Err(Error::InvalidParameters("a and b must be reduced modulo p"));
        }
        if q <= BigUint::from(1u8) {
            return Err(Error::InvalidParameters("q must be a prime above 1"));
        }
        // 4a^3 + 27b^2 != 0 (mod p)
        let discriminant = (BigUint::from(4u8) * &a * &a * &a + BigUint::from(27u8) * &b * &b) % &p;
        if discriminant.is_zero() {
            return Err(Error::InvalidParameters("curve is singular"));
        }
        Ok(CurveParameters { a, b, p, q })
    }

    /// brainpoolP256r1 (RFC 5639).
    pub fn brainpool_p256r1() -> Self {
        CurveParameters {
            a: BigUint::from_bytes_be(&hex!(
                "7D5A0975FC2C3057EEF67530417AFFE7FB8055C126DC5C6CE94A4B44F330B5D9"
            )),
            b: BigUint::from_bytes_be(&hex!(
                "26DC5C6CE94A4B44F330B5D9BBD77CBF958416295CF7E1CE6BCCDC18FF8C07B6"
            )),
            p: BigUint::from_bytes_be(&hex!(
                "A9FB57DBA1EEA9BC3E660A909D838D726E3BF623D52620282013481D1F6E5377"
            )),
            q: BigUint::from_bytes_be(&hex!(
                "A9FB57DBA1EEA9BC3E660A909D838D718C397AA3B561A6F7901E0E82974856A7"
            )),
        }
    }

    /// NIST P-256 (FIPS 186-4, also secp256r1).
    pub fn nist_p256() -> Self {
        CurveParameters {
            a: BigUint::from_bytes_be(&hex!(
                "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFC"
            )),
            b: BigUint::from_bytes_be(&hex!(
                "5AC635D8AA3A93E7B3EBBD55769886BC651D06B0CC53B0F63BCE3C3E27D2604B"
            )),
            p: BigUint::from_bytes_be(&hex!(
                "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFF"
            )),
            q: BigUint::from_bytes_be(&hex!(
                "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551"
            )),
        }
    }

    /// `y^2 = x^3 + 2x + 2` over `GF(17)`, a cyclic group of order 19.
    ///
    /// Offers no security whatsoever; useful to exercise the protocol.
    pub fn toy() -> Self {
        CurveParameters {
            a: BigUint::from(2u8),
            b: BigUint::from(2u8),
            p: BigUint::from(17u8),
            q: BigUint::from(19u8),
        }
    }

    /// Coefficient `a`.
    pub fn a(&self) -> &BigUint {
        &self.a
    }

    /// Coefficient `b`.
    pub fn b(&self) -> &BigUint {
        &self.b
    }

    /// Field modulus.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Subgroup order.
    pub fn q(&self) -> &BigUint {
        &self.q
    }

    /// Length in bytes of an encoded field element.
    pub fn field_len(&self) -> usize {
        ((self.p.bits() + 7) / 8) as usize
    }

    /// Length in bytes of an encoded scalar.
    pub fn scalar_len(&self) -> usize {
        ((self.q.bits() + 7) / 8) as usize
    }

    /// Right-hand side of the curve equation, `x^3 + ax + b mod p`.
    pub fn rhs(&self, x: &BigUint) -> BigUint {
        let x = x % &self.p;
        (&x * &x * &x + &self.a * &x + &self.b) % &self.p
    }

    /// The identity is always valid; a finite point must have reduced
    /// coordinates and satisfy the curve equation.
    pub fn is_valid(&self, point: &Point) -> bool {
        match point {
            Point::Identity => true,
            Point::Affine { x, y } => {
                x < &self.p && y < &self.p && (y * y) % &self.p == self.rhs(x)
            }
        }
    }

    /// `-P = (x, p - y)`.
    pub fn negate(&self, point: &Point) -> Point {
        match point {
            Point::Identity => Point::Identity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: (&self.p - (y % &self.p)) % &self.p,
            },
        }
    }

    /// `P + Q` using the chord-and-tangent law.
    pub fn add(&self, lhs: &Point, rhs: &Point) -> Result<Point, Error> {
        if !self.is_valid(lhs) || !self.is_valid(rhs) {
            return Err(Error::InvalidPoint);
        }
        let p = &self.p;
        let sum = match (lhs, rhs) {
            (Point::Identity, _) => rhs.clone(),
            (_, Point::Identity) => lhs.clone(),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                if x1 == x2 && ((y1 + y2) % p).is_zero() {
                    Point::Identity
                } else {
                    let slope = if x1 == x2 {
                        let numerator = (BigUint::from(3u8) * x1 * x1 + &self.a) % p;
                        let denominator = (BigUint::from(2u8) * y1) % p;
                        (numerator * mod_inverse(&denominator, p)?) % p
                    } else {
                        let numerator = sub_mod(y2, y1, p);
                        let denominator = sub_mod(x2, x1, p);
                        (numerator * mod_inverse(&denominator, p)?) % p
                    };
                    let x3 = sub_mod(&sub_mod(&(&slope * &slope), x1, p), x2, p);
                    let y3 = sub_mod(&((&slope * sub_mod(x1, &x3, p)) % p), y1, p);
                    Point::Affine { x: x3, y: y3 }
                }
            }
        };
        if !self.is_valid(&sum) {
            return Err(Error::InvalidPoint);
        }
        Ok(sum)
    }

    /// `k * P` by double-and-add, most significant bit first.
    pub fn multiply(&self, k: &BigUint, point: &Point) -> Result<Point, Error> {
        if !self.is_valid(point) {
            return Err(Error::InvalidPoint);
        }
        let mut acc = Point::Identity;
        for i in (0..k.bits()).rev() {
            acc = self.add(&acc, &acc)?;
            if k.bit(i) {
                acc = self.add(&acc, point)?;
            }
        }
        if !self.is_valid(&acc) {
            return Err(Error::InvalidPoint);
        }
        Ok(acc)
    }
}

/// `(a - b) mod p` for unsigned operands.
fn sub_mod(a: &BigUint, b: &BigUint, p: &BigUint) -> BigUint {
    ((a % p) + p - (b % p)) % p
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn pt(x: u32, y: u32) -> Point {
        Point::affine(BigUint::from(x), BigUint::from(y))
    }

    fn toy_points(curve: &CurveParameters) -> Vec<Point> {
        let mut points = Vec::new();
        for x in 0..17u32 {
            for y in 0..17u32 {
                let candidate = pt(x, y);
                if curve.is_valid(&candidate) {
                    points.push(candidate);
                }
            }
        }
        points
    }

    #[test]
    fn toy_curve_has_eighteen_finite_points() {
        let curve = CurveParameters::toy();
        assert_eq!(toy_points(&curve).len(), 18);
    }

    #[test]
    fn doubling_and_tripling_match_textbook() {
        let curve = CurveParameters::toy();
        let p = pt(5, 1);
        let two_p = curve.add(&p, &p).unwrap();
        assert_eq!(two_p, pt(6, 3));
        assert_eq!(curve.add(&two_p, &p).unwrap(), pt(10, 6));
        assert_eq!(curve.multiply(&BigUint::from(2u8), &p).unwrap(), pt(6, 3));
    }

    #[test]
    fn group_law_on_every_pair() {
        let curve = CurveParameters::toy();
        let points = toy_points(&curve);
        for p in &points {
            assert_eq!(curve.add(p, &Point::Identity).unwrap(), *p);
            assert_eq!(curve.add(&Point::Identity, p).unwrap(), *p);
            assert_eq!(curve.add(p, &curve.negate(p)).unwrap(), Point::Identity);
            for q in &points {
                let sum = curve.add(p, q).unwrap();
                assert!(curve.is_valid(&sum));
                assert_eq!(sum, curve.add(q, p).unwrap());
            }
        }
    }

    #[test]
    fn order_nineteen() {
        let curve = CurveParameters::toy();
        let p = pt(5, 1);
        assert_eq!(
            curve.multiply(&BigUint::from(19u8), &p).unwrap(),
            Point::Identity
        );

        let mut t = p.clone();
        for _ in 0..18 {
            t = curve.add(&t, &p).unwrap();
        }
        assert_eq!(curve.multiply(&BigUint::from(19u8), &p).unwrap(), t);
    }

    #[test]
    fn multiply_agrees_with_repeated_addition() {
        let curve = CurveParameters::toy();
        let p = pt(5, 1);
        let mut expected = Point::Identity;
        for k in 0..40u32 {
            assert_eq!(curve.multiply(&BigUint::from(k), &p).unwrap(), expected);
            expected = curve.add(&expected, &p).unwrap();
        }
    }

    #[test]
    fn rejects_invalid_points() {
        let curve = CurveParameters::toy();
        let off_curve = pt(5, 2);
        let unreduced = pt(5 + 17, 1);
        assert!(!curve.is_valid(&off_curve));
        assert!(!curve.is_valid(&unreduced));
        assert!(matches!(
            curve.add(&off_curve, &pt(5, 1)),
            Err(Error::InvalidPoint)
        ));
        assert!(matches!(
            curve.multiply(&BigUint::from(3u8), &unreduced),
            Err(Error::InvalidPoint)
        ));
    }

    #[test]
    fn named_curves_are_well_formed() {
        for curve in [CurveParameters::brainpool_p256r1(), CurveParameters::nist_p256()] {
            let checked = CurveParameters::new(
                curve.a().clone(),
                curve.b().clone(),
                curve.p().clone(),
                curve.q().clone(),
            )
            .unwrap();
            assert_eq!(checked, curve);
            assert_eq!(curve.field_len(), 32);
            assert_eq!(curve.scalar_len(), 32);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        let big = |v: u32| BigUint::from(v);
        assert!(CurveParameters::new(big(2), big(2), big(16), big(19)).is_err());
        let huge = (BigUint::from(1u8) << (MAX_FIELD_BITS as usize)) + 1u32;
        assert!(matches!(
            CurveParameters::new(big(2), big(2), huge, big(19)),
            Err(Error::InvalidParameters("p is too large"))
        ));
        assert!(CurveParameters::new(big(20), big(2), big(17), big(19)).is_err());
        assert!(CurveParameters::new(big(0), big(0), big(17), big(19)).is_err());
        assert!(CurveParameters::new(big(2), big(2), big(17), big(1)).is_err());
    }
}
