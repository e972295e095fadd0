//! Linear non-linkable ring signatures.
//!
//! Grounded on `original_source/schemes/ring_pedersen_elgamal.py::generate_ring_signature`
//! / `verify_ring_signature`. Linkability is explicitly not provided (§4.4).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::curve::{CurveId, Point, Scalar};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RingSignature {
    pub c0: Scalar,
    pub s: Vec<Scalar>,
}

fn ring_challenge(curve: CurveId, index: usize, message_hash: &Scalar, point: &Point) -> Scalar {
    let data = format!("{}:{}:{}", index, message_hash.to_decimal_string(), point.x_decimal());
    Scalar::hash_to_scalar(curve, data.as_bytes())
}

/// Sign `message` over the public-key ring `public_keys`, as member
/// `signer_idx` holding `signer_key`.
///
/// `signer_idx >= public_keys.len()` or an empty ring are programmer errors
/// (see §7: "only programmer errors may abort") and panic rather than
/// return a `Result`.
pub fn sign(
    curve: CurveId,
    message: &str,
    signer_idx: usize,
    public_keys: &[Point],
    signer_key: &Scalar,
    rng: &mut impl rand::RngCore,
) -> RingSignature {
    let n = public_keys.len();
    assert!(n > 0, "ring signature requires a non-empty public-key list");
    assert!(signer_idx < n, "signer index must be less than the ring size");

    let message_hash = Scalar::hash_to_scalar(curve, message.as_bytes());
    let g = Point::generator(curve);

    let mut c = vec![Scalar::zero(curve); n];
    let mut s = vec![Scalar::zero(curve); n];

    let k = Scalar::random(curve, rng);
    let signer_point = g.mul(&k);

    for i in 0..n {
        if i != signer_idx {
            s[i] = Scalar::random(curve, rng);
            let point = g.mul(&s[i]).add(&public_keys[i].mul(&c[i]));
            c[(i + 1) % n] = ring_challenge(curve, i, &message_hash, &point);
        }
    }

    c[(signer_idx + 1) % n] = ring_challenge(curve, signer_idx, &message_hash, &signer_point);
    s[signer_idx] = k.sub(&signer_key.mul(&c[signer_idx]));

    RingSignature { c0: c[0].clone(), s }
}

/// Walk the ring recomputing each `c_{i+1}`; the signature is valid iff it
/// closes back to `c0`.
pub fn verify(curve: CurveId, message: &str, public_keys: &[Point], signature: &RingSignature) -> bool {
    let n = public_keys.len();
    if n == 0 || signature.s.len() != n {
        warn!(proof = "ring_signature", "ring size mismatch");
        return false;
    }

    let message_hash = Scalar::hash_to_scalar(curve, message.as_bytes());
    let g = Point::generator(curve);

    let mut c = signature.c0.clone();
    for i in 0..n {
        let point = g.mul(&signature.s[i]).add(&public_keys[i].mul(&c));
        c = ring_challenge(curve, i, &message_hash, &point);
    }

    let closes = c == signature.c0;
    if !closes {
        warn!(proof = "ring_signature", "ring did not close");
    }
    closes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;

    fn ring(curve: CurveId, n: usize, rng: &mut impl rand::RngCore) -> (Vec<Point>, Vec<Scalar>) {
        let mut pks = Vec::with_capacity(n);
        let mut sks = Vec::with_capacity(n);
        for _ in 0..n {
            let kp = Keypair::generate(curve, rng);
            sks.push(kp.secret());
            pks.push(kp.pk);
        }
        (pks, sks)
    }

    #[test]
    fn honest_signer_verifies() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let (pks, sks) = ring(curve, 5, &mut rng);
        let sig = sign(curve, "pay bob", 2, &pks, &sks[2], &mut rng);
        assert!(verify(curve, "pay bob", &pks, &sig));
    }

    #[test]
    fn substituted_message_fails() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let (pks, sks) = ring(curve, 5, &mut rng);
        let sig = sign(curve, "pay bob", 2, &pks, &sks[2], &mut rng);
        assert!(!verify(curve, "pay eve", &pks, &sig));
    }

    #[test]
    fn shuffling_ring_preserves_validity_with_adjusted_index() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let (pks, sks) = ring(curve, 4, &mut rng);

        // rotate the ring left by one; signer moves from index 1 to index 0
        let mut shuffled = pks.clone();
        shuffled.rotate_left(1);
        let new_idx = 0;
        assert_eq!(shuffled[new_idx], pks[1]);

        let sig = sign(curve, "msg", new_idx, &shuffled, &sks[1], &mut rng);
        assert!(verify(curve, "msg", &shuffled, &sig));
    }

    #[test]
    #[should_panic]
    fn empty_ring_panics() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let sk = Scalar::random(curve, &mut rng);
        sign(curve, "msg", 0, &[], &sk, &mut rng);
    }
}
