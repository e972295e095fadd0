//! Publicly verifiable homomorphic subtraction: `Enc(a) - Enc(b) = Enc(a-b)`.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::create_subtraction_proof`
//! / `verify_subtraction_proof`. No witness is involved — any verifier can
//! recompute the relation and the binding hash directly from the three
//! ciphertexts.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::curve::{CurveId, Scalar};
use crate::elgamal::Ciphertext;
use crate::error::{LedgerError, ProofFailure};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubtractionProof {
    pub original: Ciphertext,
    pub amount: Ciphertext,
    pub result: Ciphertext,
    pub hash: Scalar,
}

fn binding_hash(curve: CurveId, original: &Ciphertext, amount: &Ciphertext, result: &Ciphertext) -> Scalar {
    let data = format!(
        "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
        original.c1.x_decimal(),
        original.c1.y_decimal(),
        original.c2.x_decimal(),
        original.c2.y_decimal(),
        amount.c1.x_decimal(),
        amount.c1.y_decimal(),
        amount.c2.x_decimal(),
        amount.c2.y_decimal(),
        result.c1.x_decimal(),
        result.c1.y_decimal(),
        result.c2.x_decimal(),
        result.c2.y_decimal(),
    );
    Scalar::hash_to_scalar(curve, data.as_bytes())
}

/// Construct the proof; fails if `result` does not actually equal
/// `original - amount` coordinate-wise.
pub fn create(
    curve: CurveId,
    original: &Ciphertext,
    amount: &Ciphertext,
    result: &Ciphertext,
) -> Result<SubtractionProof, LedgerError> {
    let expected = original.sub(amount);
    if result != &expected {
        return Err(LedgerError::InvalidInput(
            "ciphertext relationship doesn't hold".into(),
        ));
    }
    let hash = binding_hash(curve, original, amount, result);
    Ok(SubtractionProof {
        original: original.clone(),
        amount: amount.clone(),
        result: result.clone(),
        hash,
    })
}

pub fn verify(curve: CurveId, proof: &SubtractionProof) -> Result<(), LedgerError> {
    let expected_result = proof.original.sub(&proof.amount);
    if proof.result != expected_result {
        warn!(proof = "subtraction_proof", "relation violated");
        return Err(ProofFailure::SubtractionRelation.into());
    }
    let expected_hash = binding_hash(curve, &proof.original, &proof.amount, &proof.result);
    if expected_hash != proof.hash {
        warn!(proof = "subtraction_proof", "binding hash mismatch");
        return Err(ProofFailure::SubtractionRelation.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Point;
    use crate::keys::Keypair;
    use num_bigint::BigUint;

    #[test]
    fn valid_subtraction_verifies() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let pk = Keypair::generate(curve, &mut rng);
        let g = Point::generator(curve);

        let k1 = Scalar::random(curve, &mut rng);
        let k2 = Scalar::random(curve, &mut rng);
        let a = Scalar::new(curve, BigUint::from(100u32));
        let b = Scalar::new(curve, BigUint::from(30u32));

        let original = Ciphertext {
            c1: g.mul(&k1),
            c2: g.mul(&a).add(&pk.public().mul(&k1)),
        };
        let amount = Ciphertext {
            c1: g.mul(&k2),
            c2: g.mul(&b).add(&pk.public().mul(&k2)),
        };
        let result = original.sub(&amount);

        let proof = create(curve, &original, &amount, &result).unwrap();
        assert!(verify(curve, &proof).is_ok());
    }

    #[test]
    fn mismatched_result_is_rejected_at_construction() {
        let curve = CurveId::P192;
        let g = Point::generator(curve);
        let original = Ciphertext { c1: g.clone(), c2: g.clone() };
        let amount = Ciphertext { c1: g.clone(), c2: g.clone() };
        let bogus_result = Ciphertext { c1: g.clone(), c2: g.double() };
        assert!(create(curve, &original, &amount, &bogus_result).is_err());
    }

    #[test]
    fn tampered_proof_fails_verification() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let pk = Keypair::generate(curve, &mut rng);
        let g = Point::generator(curve);
        let k1 = Scalar::random(curve, &mut rng);
        let a = Scalar::new(curve, BigUint::from(10u32));
        let original = Ciphertext {
            c1: g.mul(&k1),
            c2: g.mul(&a).add(&pk.public().mul(&k1)),
        };
        let zero = Ciphertext { c1: Point::identity(curve), c2: Point::identity(curve) };
        let result = original.sub(&zero);
        let mut proof = create(curve, &original, &zero, &result).unwrap();
        proof.result.c1 = proof.result.c1.add(&g);
        assert!(verify(curve, &proof).is_err());
    }
}
