//! Pedersen commitments: `C(v, r) = v*G + r*H`.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::pedersen_commit`.

use crate::curve::{CurveId, Point, Scalar};

/// `C(v, r) = v*G + r*H`. Binding under discrete-log hardness; perfectly
/// hiding for uniform `r`.
pub fn commit(curve: CurveId, value: &Scalar, blinding: &Scalar, h: &Point) -> Point {
    let g = Point::generator(curve);
    g.mul(value).add(&h.mul(blinding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn homomorphic_addition() {
        let curve = CurveId::P192;
        let h = Point::generator(curve).mul(&Scalar::hash_to_scalar(curve, b"test-H"));
        let v1 = Scalar::new(curve, BigUint::from(3u32));
        let v2 = Scalar::new(curve, BigUint::from(5u32));
        let r1 = Scalar::new(curve, BigUint::from(11u32));
        let r2 = Scalar::new(curve, BigUint::from(13u32));

        let c1 = commit(curve, &v1, &r1, &h);
        let c2 = commit(curve, &v2, &r2, &h);
        let sum = c1.add(&c2);

        let expected = commit(curve, &v1.add(&v2), &r1.add(&r2), &h);
        assert_eq!(sum, expected);
    }

    #[test]
    fn distinct_blindings_hide_equal_values() {
        let curve = CurveId::P192;
        let h = Point::generator(curve).mul(&Scalar::hash_to_scalar(curve, b"test-H"));
        let v = Scalar::new(curve, BigUint::from(42u32));
        let r1 = Scalar::new(curve, BigUint::from(7u32));
        let r2 = Scalar::new(curve, BigUint::from(8u32));
        assert_ne!(commit(curve, &v, &r1, &h), commit(curve, &v, &r2, &h));
    }
}
