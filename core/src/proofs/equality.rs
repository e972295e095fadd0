//! Proof that an ElGamal ciphertext and a Pedersen commitment hide the same
//! value, via one joint Sigma-protocol over `(v, elgamal_randomness, blinding)`.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::create_commitment_equality_proof`
//! / `verify_commitment_equality_proof`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::curve::{CurveId, Point, Scalar};
use crate::elgamal::Ciphertext;
use crate::error::{LedgerError, ProofFailure};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EqualityProof {
    pub r1: Point,
    pub r2: Point,
    pub r3: Point,
    pub c: Scalar,
    pub sv: Scalar,
    pub se: Scalar,
    pub sp: Scalar,
}

fn challenge(curve: CurveId, ciphertext: &Ciphertext, commitment: &Point, r1: &Point, r2: &Point, r3: &Point) -> Scalar {
    let data = format!(
        "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
        ciphertext.c1.x_decimal(),
        ciphertext.c1.y_decimal(),
        ciphertext.c2.x_decimal(),
        ciphertext.c2.y_decimal(),
        commitment.x_decimal(),
        commitment.y_decimal(),
        r1.x_decimal(),
        r1.y_decimal(),
        r2.x_decimal(),
        r2.y_decimal(),
        r3.x_decimal(),
        r3.y_decimal(),
    );
    Scalar::hash_to_scalar(curve, data.as_bytes())
}

/// `ciphertext = (k*G, v*G + k*recipient_pk)`, `commitment = v*G + r*H`.
pub fn create(
    curve: CurveId,
    h: &Point,
    value: &Scalar,
    elgamal_randomness: &Scalar,
    pedersen_blinding: &Scalar,
    ciphertext: &Ciphertext,
    commitment: &Point,
    recipient_pk: &Point,
    rng: &mut impl rand::RngCore,
) -> EqualityProof {
    let g = Point::generator(curve);
    let rv = Scalar::random(curve, rng);
    let re = Scalar::random(curve, rng);
    let rp = Scalar::random(curve, rng);

    let r1 = g.mul(&re);
    let r2 = g.mul(&rv).add(&recipient_pk.mul(&re));
    let r3 = g.mul(&rv).add(&h.mul(&rp));

    let c = challenge(curve, ciphertext, commitment, &r1, &r2, &r3);

    let sv = rv.add(&c.mul(value));
    let se = re.add(&c.mul(elgamal_randomness));
    let sp = rp.add(&c.mul(pedersen_blinding));

    EqualityProof { r1, r2, r3, c, sv, se, sp }
}

pub fn verify(
    curve: CurveId,
    h: &Point,
    ciphertext: &Ciphertext,
    commitment: &Point,
    recipient_pk: &Point,
    proof: &EqualityProof,
) -> Result<(), LedgerError> {
    let expected_c = challenge(curve, ciphertext, commitment, &proof.r1, &proof.r2, &proof.r3);
    if expected_c != proof.c {
        warn!(proof = "equality_proof", "challenge mismatch");
        return Err(ProofFailure::EqualityNonce.into());
    }

    let g = Point::generator(curve);
    let r1_check = g.mul(&proof.se).sub(&ciphertext.c1.mul(&proof.c));
    let r2_check = g
        .mul(&proof.sv)
        .add(&recipient_pk.mul(&proof.se))
        .sub(&ciphertext.c2.mul(&proof.c));
    let r3_check = g.mul(&proof.sv).add(&h.mul(&proof.sp)).sub(&commitment.mul(&proof.c));

    if r1_check != proof.r1 || r2_check != proof.r2 || r3_check != proof.r3 {
        warn!(proof = "equality_proof", "reconstructed nonce mismatch");
        return Err(ProofFailure::EqualityNonce.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment;
    use crate::keys::Keypair;
    use num_bigint::BigUint;

    fn h(curve: CurveId) -> Point {
        Point::generator(curve).mul(&Scalar::hash_to_scalar(curve, b"test-H"))
    }

    #[test]
    fn matching_ciphertext_and_commitment_verify() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let h = h(curve);
        let recipient = Keypair::generate(curve, &mut rng);

        let v = Scalar::new(curve, BigUint::from(7u32));
        let k = Scalar::random(curve, &mut rng);
        let r = Scalar::random(curve, &mut rng);

        let g = Point::generator(curve);
        let ciphertext = Ciphertext {
            c1: g.mul(&k),
            c2: g.mul(&v).add(&recipient.public().mul(&k)),
        };
        let comm = commitment::commit(curve, &v, &r, &h);

        let proof = create(curve, &h, &v, &k, &r, &ciphertext, &comm, recipient.public(), &mut rng);
        assert!(verify(curve, &h, &ciphertext, &comm, recipient.public(), &proof).is_ok());
    }

    #[test]
    fn swapped_values_fail_verification() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let h = h(curve);
        let recipient = Keypair::generate(curve, &mut rng);
        let g = Point::generator(curve);

        let v1 = Scalar::new(curve, BigUint::from(7u32));
        let v2 = Scalar::new(curve, BigUint::from(9u32));
        let k = Scalar::random(curve, &mut rng);
        let r = Scalar::random(curve, &mut rng);

        let ciphertext = Ciphertext {
            c1: g.mul(&k),
            c2: g.mul(&v1).add(&recipient.public().mul(&k)),
        };
        // commitment to a *different* value than the ciphertext encrypts
        let comm = commitment::commit(curve, &v2, &r, &h);

        let proof = create(curve, &h, &v1, &k, &r, &ciphertext, &comm, recipient.public(), &mut rng);
        assert!(verify(curve, &h, &ciphertext, &comm, recipient.public(), &proof).is_err());
    }
}
