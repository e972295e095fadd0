//! Stealth addresses: one-shot recipient identifiers derived from dual
//! view/spend keys.
//!
//! Grounded on `original_source/schemes/ring_pedersen_elgamal.py::generate_stealth_address`
//! / `recover_stealth_address`.

use crate::curve::{CurveId, Point, Scalar};

/// Per-transfer `(R, P)` pair. `R` is public; only the holder of `view_sk`
/// can link `P` back to `spend_pk`.
#[derive(Clone, Debug)]
pub struct StealthAddress {
    pub r: Point,
    pub p: Point,
}

fn shared_secret_scalar(curve: CurveId, shared_secret_point: &Point) -> Scalar {
    Scalar::hash_to_scalar(curve, shared_secret_point.x_decimal().as_bytes())
}

/// Sender side: draw a fresh `r`, derive the shared secret via the
/// recipient's view key, and compute the one-time spend address.
pub fn generate(curve: CurveId, recipient_view_pk: &Point, recipient_spend_pk: &Point, rng: &mut impl rand::RngCore) -> StealthAddress {
    let r = Scalar::random(curve, rng);
    let big_r = Point::generator(curve).mul(&r);

    let shared_secret_point = recipient_view_pk.mul(&r);
    let h = shared_secret_scalar(curve, &shared_secret_point);

    let p = Point::generator(curve).mul(&h).add(recipient_spend_pk);
    StealthAddress { r: big_r, p }
}

/// Recipient side: recompute the shared secret with `view_sk` and test
/// `P == h*G + spend_pk`.
pub fn recover(r: &Point, p: &Point, view_sk: &Scalar, spend_pk: &Point) -> bool {
    let curve = r.curve;
    let shared_secret_point = r.mul(view_sk);
    let h = shared_secret_scalar(curve, &shared_secret_point);
    let expected_p = Point::generator(curve).mul(&h).add(spend_pk);
    &expected_p == p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;

    #[test]
    fn recipient_recognizes_own_stealth_address() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let view = Keypair::generate(curve, &mut rng);
        let spend = Keypair::generate(curve, &mut rng);

        let addr = generate(curve, view.public(), spend.public(), &mut rng);
        assert!(recover(&addr.r, &addr.p, &view.secret(), spend.public()));
    }

    #[test]
    fn other_recipient_does_not_recognize_it() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let view = Keypair::generate(curve, &mut rng);
        let spend = Keypair::generate(curve, &mut rng);
        let other_view = Keypair::generate(curve, &mut rng);

        let addr = generate(curve, view.public(), spend.public(), &mut rng);
        assert!(!recover(&addr.r, &addr.p, &other_view.secret(), spend.public()));
    }
}
