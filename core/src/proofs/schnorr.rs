//! Schnorr signatures and the message-less proof of knowledge used to link
//! range-proof blinding gaps.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::schnorr_sign`,
//! `schnorr_verify_message`, `schnorr_prove`, `schnorr_verify`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::curve::{CurveId, Point, Scalar};
use crate::error::{LedgerError, ProofFailure};

/// `R = k*G`, `e = H(pk.x:pk.y:R.x:R.y:message)`, `s = k - e*sk mod q`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchnorrSignature {
    pub r: Point,
    pub e: Scalar,
    pub s: Scalar,
}

fn challenge(pk: &Point, r: &Point, message: &str) -> Scalar {
    let data = format!(
        "{}:{}:{}:{}:{}",
        pk.x_decimal(),
        pk.y_decimal(),
        r.x_decimal(),
        r.y_decimal(),
        message
    );
    Scalar::hash_to_scalar(pk.curve, data.as_bytes())
}

/// Sign `message` under `sk`, binding it to `pk = sk*G`.
pub fn sign(curve: CurveId, sk: &Scalar, pk: &Point, message: &str, rng: &mut impl rand::RngCore) -> SchnorrSignature {
    let k = Scalar::random(curve, rng);
    let r = Point::generator(curve).mul(&k);
    let e = challenge(pk, &r, message);
    let s = k.sub(&e.mul(sk));
    SchnorrSignature { r, e, s }
}

/// Verify: recompute `e`, then `s*G + e*pk ?= R`.
pub fn verify(pk: &Point, signature: &SchnorrSignature, message: &str) -> Result<(), LedgerError> {
    let expected_e = challenge(pk, &signature.r, message);
    if expected_e != signature.e {
        warn!(proof = "schnorr_signature", "challenge mismatch");
        return Err(ProofFailure::SchnorrSignature.into());
    }
    let curve = pk.curve;
    let check = Point::generator(curve).mul(&signature.s).add(&pk.mul(&signature.e));
    if check != signature.r {
        warn!(proof = "schnorr_signature", "verification equation failed");
        return Err(ProofFailure::SchnorrSignature.into());
    }
    debug!(proof = "schnorr_signature", "ok");
    Ok(())
}

/// A Schnorr proof of knowledge of the discrete log of `P = x*G`, without a
/// bound message. Used internally only — never as a transaction
/// authorization mechanism (see SPEC_FULL.md §9's resolved open question).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchnorrPoK {
    pub c: Scalar,
    pub s: Scalar,
}

pub fn prove(curve: CurveId, x: &Scalar, p: &Point, rng: &mut impl rand::RngCore) -> SchnorrPoK {
    let k = Scalar::random(curve, rng);
    let r = Point::generator(curve).mul(&k);
    let c = Scalar::hash_to_scalar(
        curve,
        format!("{}:{}:{}:{}", p.x_decimal(), p.y_decimal(), r.x_decimal(), r.y_decimal()).as_bytes(),
    );
    let s = k.sub(&c.mul(x));
    SchnorrPoK { c, s }
}

pub fn verify_pok(p: &Point, proof: &SchnorrPoK) -> bool {
    let curve = p.curve;
    let r = Point::generator(curve).mul(&proof.s).add(&p.mul(&proof.c));
    let expected_c = Scalar::hash_to_scalar(
        curve,
        format!("{}:{}:{}:{}", p.x_decimal(), p.y_decimal(), r.x_decimal(), r.y_decimal()).as_bytes(),
    );
    expected_c == proof.c
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn sign_verify_roundtrip() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let sk = Scalar::random(curve, &mut rng);
        let pk = Point::generator(curve).mul(&sk);
        let sig = sign(curve, &sk, &pk, "hello", &mut rng);
        assert!(verify(&pk, &sig, "hello").is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let sk = Scalar::random(curve, &mut rng);
        let pk = Point::generator(curve).mul(&sk);
        let sig = sign(curve, &sk, &pk, "hello", &mut rng);
        assert!(verify(&pk, &sig, "goodbye").is_err());
    }

    #[test]
    fn pok_roundtrip() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let x = Scalar::new(curve, BigUint::from(99u32));
        let p = Point::generator(curve).mul(&x);
        let proof = prove(curve, &x, &p, &mut rng);
        assert!(verify_pok(&p, &proof));
    }
}
