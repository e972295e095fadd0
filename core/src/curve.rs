//! Short-Weierstrass elliptic-curve arithmetic over an arbitrary-precision
//! prime field, parametric in a [`CurveId`] preset.
//!
//! `curve25519-dalek`-style fixed-size Edwards fields don't fit here: the
//! confidential-transaction scheme needs a group whose order supports a
//! dense plaintext value table and two interchangeable bit-widths
//! (NIST P-256 by default, NIST P-192 for cheaper demo-scale proofs), so
//! field and scalar arithmetic run over [`num_bigint::BigUint`] instead.

use std::sync::OnceLock;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Decimal-string (de)serialization for [`BigUint`], matching the external
/// JSON format's requirement that point coordinates are plain decimal
/// integers rather than num-bigint's native little-endian digit arrays.
pub(crate) mod big_serde {
    use num_bigint::BigUint;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &BigUint, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(d)?;
        BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom("expected a decimal integer string"))
    }
}

/// Which curve preset a [`Point`] or [`Scalar`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveId {
    #[serde(rename = "secp256r1")]
    P256,
    #[serde(rename = "secp192r1")]
    P192,
}

impl CurveId {
    pub fn params(self) -> &'static CurveParams {
        static P256: OnceLock<CurveParams> = OnceLock::new();
        static P192: OnceLock<CurveParams> = OnceLock::new();
        match self {
            CurveId::P256 => P256.get_or_init(CurveParams::p256),
            CurveId::P192 => P192.get_or_init(CurveParams::p192),
        }
    }
}

fn hex_biguint(s: &str) -> BigUint {
    BigUint::parse_bytes(s.as_bytes(), 16).expect("hardcoded curve constant is valid hex")
}

/// Domain parameters of a short-Weierstrass curve `y^2 = x^3 + a*x + b mod p`.
#[derive(Clone, Debug)]
pub struct CurveParams {
    pub id: CurveId,
    pub p: BigUint,
    pub a: BigUint,
    pub b: BigUint,
    pub gx: BigUint,
    pub gy: BigUint,
    /// Group order (the curve is chosen prime-order so scalars live mod `n`).
    pub n: BigUint,
}

impl CurveParams {
    fn p256() -> CurveParams {
        CurveParams {
            id: CurveId::P256,
            p: hex_biguint(
                "ffffffff00000001000000000000000000000000ffffffffffffffffffffffff",
            ),
            a: hex_biguint(
                "ffffffff00000001000000000000000000000000fffffffffffffffffffffffc",
            ),
            b: hex_biguint(
                "5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b",
            ),
            gx: hex_biguint(
                "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
            ),
            gy: hex_biguint(
                "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5",
            ),
            n: hex_biguint(
                "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551",
            ),
        }
    }

    fn p192() -> CurveParams {
        CurveParams {
            id: CurveId::P192,
            p: hex_biguint("fffffffffffffffffffffffffffffffeffffffffffffffff"),
            a: hex_biguint("fffffffffffffffffffffffffffffffefffffffffffffffc"),
            b: hex_biguint("64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1"),
            gx: hex_biguint("188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012"),
            gy: hex_biguint("07192b95ffc8da78631011ed6b24cdd573f977a11e794811"),
            n: hex_biguint("ffffffffffffffffffffffff99def836146bc9b1b4d22831"),
        }
    }

    pub fn generator(&self) -> Point {
        Point {
            curve: self.id,
            x: self.gx.clone(),
            y: self.gy.clone(),
            is_identity: false,
        }
    }

    pub fn identity(&self) -> Point {
        Point {
            curve: self.id,
            x: BigUint::zero(),
            y: BigUint::zero(),
            is_identity: true,
        }
    }
}

/// Reduce `(a - b) mod m` into `[0, m)` without relying on `BigInt`, since
/// both operands here are always already reduced mod `m`.
fn sub_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    if a >= b {
        (a - b).mod_floor(m)
    } else {
        (m - (b - a).mod_floor(m)).mod_floor(m)
    }
}

fn add_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a + b).mod_floor(m)
}

fn mul_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a * b).mod_floor(m)
}

/// Modular inverse via Fermat's little theorem; both curve fields and both
/// curve orders used here are prime.
fn inv_mod(a: &BigUint, m: &BigUint) -> BigUint {
    let exponent = m - BigUint::from(2u32);
    a.modpow(&exponent, m)
}

/// A scalar modulo a curve's group order `n`. Serializes the same way as
/// [`Point`] coordinates: a decimal-string integer alongside the curve tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scalar {
    curve: CurveId,
    #[serde(with = "big_serde")]
    value: BigUint,
}

impl Scalar {
    pub fn new(curve: CurveId, value: BigUint) -> Self {
        let n = &curve.params().n;
        Scalar {
            curve,
            value: value.mod_floor(n),
        }
    }

    pub fn zero(curve: CurveId) -> Self {
        Scalar::new(curve, BigUint::zero())
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Uniform random scalar in `[1, n-1]`.
    pub fn random(curve: CurveId, rng: &mut impl RngCore) -> Self {
        let n = &curve.params().n;
        let bits = n.bits() as usize;
        let bytes = (bits + 7) / 8;
        loop {
            let mut buf = vec![0u8; bytes];
            rng.fill_bytes(&mut buf);
            let candidate = BigUint::from_bytes_be(&buf);
            if candidate > BigUint::zero() && &candidate < n {
                return Scalar {
                    curve,
                    value: candidate,
                };
            }
        }
    }

    /// `hash_to_scalar`: SHA-256 of arbitrary bytes, reduced mod `n`.
    pub fn hash_to_scalar(curve: CurveId, data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let n = &curve.params().n;
        Scalar {
            curve,
            value: BigUint::from_bytes_be(&digest).mod_floor(n),
        }
    }

    pub fn add(&self, other: &Scalar) -> Scalar {
        debug_assert_eq!(self.curve, other.curve);
        let n = &self.curve.params().n;
        Scalar {
            curve: self.curve,
            value: add_mod(&self.value, &other.value, n),
        }
    }

    pub fn sub(&self, other: &Scalar) -> Scalar {
        debug_assert_eq!(self.curve, other.curve);
        let n = &self.curve.params().n;
        Scalar {
            curve: self.curve,
            value: sub_mod(&self.value, &other.value, n),
        }
    }

    pub fn mul(&self, other: &Scalar) -> Scalar {
        debug_assert_eq!(self.curve, other.curve);
        let n = &self.curve.params().n;
        Scalar {
            curve: self.curve,
            value: mul_mod(&self.value, &other.value, n),
        }
    }

    pub fn neg(&self) -> Scalar {
        let n = &self.curve.params().n;
        Scalar {
            curve: self.curve,
            value: sub_mod(&BigUint::zero(), &self.value, n),
        }
    }

    pub fn to_decimal_string(&self) -> String {
        self.value.to_str_radix(10)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

/// A point on a [`CurveId`] preset's curve, in affine coordinates.
///
/// `is_identity` marks the point at infinity; `x`/`y` are meaningless (held
/// at zero) in that case. Coordinates serialize as decimal-integer strings
/// to match the external JSON format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub curve: CurveId,
    #[serde(with = "big_serde")]
    pub x: BigUint,
    #[serde(with = "big_serde")]
    pub y: BigUint,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_identity: bool,
}

impl Point {
    pub fn generator(curve: CurveId) -> Point {
        curve.params().generator()
    }

    pub fn identity(curve: CurveId) -> Point {
        curve.params().identity()
    }

    pub fn is_on_curve(&self) -> bool {
        if self.is_identity {
            return true;
        }
        let params = self.curve.params();
        let lhs = mul_mod(&self.y, &self.y, &params.p);
        let x3 = mul_mod(&mul_mod(&self.x, &self.x, &params.p), &self.x, &params.p);
        let ax = mul_mod(&params.a, &self.x, &params.p);
        let rhs = add_mod(&add_mod(&x3, &ax, &params.p), &params.b, &params.p);
        lhs == rhs
    }

    pub fn add(&self, other: &Point) -> Point {
        debug_assert_eq!(self.curve, other.curve);
        let params = self.curve.params();
        if self.is_identity {
            return other.clone();
        }
        if other.is_identity {
            return self.clone();
        }
        if self.x == other.x {
            if self.y == other.y && !self.y.is_zero() {
                return self.double();
            }
            // x equal, y differs (or y == 0): P + (-P) = O.
            return Point::identity(self.curve);
        }
        let num = sub_mod(&other.y, &self.y, &params.p);
        let den = sub_mod(&other.x, &self.x, &params.p);
        let lambda = mul_mod(&num, &inv_mod(&den, &params.p), &params.p);
        let x3 = sub_mod(
            &sub_mod(&mul_mod(&lambda, &lambda, &params.p), &self.x, &params.p),
            &other.x,
            &params.p,
        );
        let y3 = sub_mod(
            &mul_mod(&lambda, &sub_mod(&self.x, &x3, &params.p), &params.p),
            &self.y,
            &params.p,
        );
        Point {
            curve: self.curve,
            x: x3,
            y: y3,
            is_identity: false,
        }
    }

    pub fn double(&self) -> Point {
        let params = self.curve.params();
        if self.is_identity || self.y.is_zero() {
            return Point::identity(self.curve);
        }
        let three_x2 = mul_mod(
            &BigUint::from(3u32),
            &mul_mod(&self.x, &self.x, &params.p),
            &params.p,
        );
        let num = add_mod(&three_x2, &params.a, &params.p);
        let den = mul_mod(&BigUint::from(2u32), &self.y, &params.p);
        let lambda = mul_mod(&num, &inv_mod(&den, &params.p), &params.p);
        let x3 = sub_mod(
            &mul_mod(&lambda, &lambda, &params.p),
            &add_mod(&self.x, &self.x, &params.p),
            &params.p,
        );
        let y3 = sub_mod(
            &mul_mod(&lambda, &sub_mod(&self.x, &x3, &params.p), &params.p),
            &self.y,
            &params.p,
        );
        Point {
            curve: self.curve,
            x: x3,
            y: y3,
            is_identity: false,
        }
    }

    pub fn neg(&self) -> Point {
        if self.is_identity {
            return self.clone();
        }
        let params = self.curve.params();
        Point {
            curve: self.curve,
            x: self.x.clone(),
            y: sub_mod(&BigUint::zero(), &self.y, &params.p),
            is_identity: false,
        }
    }

    pub fn sub(&self, other: &Point) -> Point {
        self.add(&other.neg())
    }

    /// Scalar multiplication via double-and-add. `k` is reduced mod the
    /// curve order before the walk.
    pub fn mul(&self, k: &Scalar) -> Point {
        debug_assert_eq!(self.curve, k.curve());
        let mut result = Point::identity(self.curve);
        let mut addend = self.clone();
        let bits = k.value().bits();
        for i in 0..bits {
            if k.value().bit(i) {
                result = result.add(&addend);
            }
            addend = addend.double();
        }
        result
    }

    pub fn x_decimal(&self) -> String {
        self.x.to_str_radix(10)
    }

    pub fn y_decimal(&self) -> String {
        self.y.to_str_radix(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve_for_both_presets() {
        assert!(Point::generator(CurveId::P256).is_on_curve());
        assert!(Point::generator(CurveId::P192).is_on_curve());
    }

    #[test]
    fn doubling_matches_repeated_addition() {
        let g = Point::generator(CurveId::P192);
        let doubled = g.double();
        let added = g.add(&g);
        assert_eq!(doubled, added);
    }

    #[test]
    fn scalar_mul_by_order_is_identity() {
        let curve = CurveId::P192;
        let g = Point::generator(curve);
        let n = Scalar::new(curve, curve.params().n.clone());
        let result = g.mul(&n);
        assert!(result.is_identity);
    }

    #[test]
    fn point_plus_negation_is_identity() {
        let curve = CurveId::P192;
        let g = Point::generator(curve);
        let result = g.add(&g.neg());
        assert!(result.is_identity);
    }

    #[test]
    fn scalar_add_sub_roundtrip() {
        let curve = CurveId::P256;
        let mut rng = rand::thread_rng();
        let a = Scalar::random(curve, &mut rng);
        let b = Scalar::random(curve, &mut rng);
        let sum = a.add(&b);
        let back = sum.sub(&b);
        assert_eq!(back, a);
    }

    #[test]
    fn point_decimal_json_roundtrip() {
        let g = Point::generator(CurveId::P256);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains("secp256r1"));
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }
}
