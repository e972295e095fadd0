//! Bit-decomposition range proof: `v in [min, max]`.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::range_proof` /
//! `verify_range_proof`. Explicitly simpler than a Bulletproof (§1 Non-goals):
//! one OR-proof per bit plus a single linking Schnorr proof on the blinding
//! gap, rather than an inner-product argument.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::commitment;
use crate::curve::{CurveId, Point, Scalar};
use crate::error::{LedgerError, ProofFailure};
use crate::proofs::bit::{self, BitProof};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SumProof {
    pub t: Point,
    pub c: Scalar,
    pub s: Scalar,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RangeProof {
    pub commitment: Point,
    pub min: u64,
    pub max: u64,
    pub bit_commitments: Vec<Point>,
    pub bit_proofs: Vec<BitProof>,
    pub sum_proof: SumProof,
}

fn n_bits(min: u64, max: u64) -> u32 {
    let range_size = max - min;
    if range_size == 0 {
        0
    } else {
        64 - range_size.leading_zeros()
    }
}

fn sum_challenge(curve: CurveId, commitment: &Point, t: &Point) -> Scalar {
    let data = format!(
        "{}:{}:{}:{}",
        commitment.x_decimal(),
        commitment.y_decimal(),
        t.x_decimal(),
        t.y_decimal(),
    );
    Scalar::hash_to_scalar(curve, data.as_bytes())
}

/// Create a range proof for `v in [min, max]`. If `commitment` is supplied,
/// `blinding_factor` must also be supplied and is checked consistent before
/// proof construction; otherwise a fresh commitment/blinding pair is drawn.
pub fn create(
    curve: CurveId,
    h: &Point,
    value: u64,
    min: u64,
    max: u64,
    commitment_and_blinding: Option<(Point, Scalar)>,
    rng: &mut impl rand::RngCore,
) -> Result<RangeProof, LedgerError> {
    if value < min || value > max {
        return Err(LedgerError::InvalidInput(format!(
            "value {value} is not in range [{min}, {max}]"
        )));
    }

    let value_scalar = Scalar::new(curve, num_bigint::BigUint::from(value));
    let (comm, blinding) = match commitment_and_blinding {
        Some((comm, blinding)) => {
            let expected = commitment::commit(curve, &value_scalar, &blinding, h);
            if expected != comm {
                return Err(LedgerError::InvalidInput(
                    "provided commitment doesn't match value and blinding factor".into(),
                ));
            }
            (comm, blinding)
        }
        None => {
            let blinding = Scalar::random(curve, rng);
            (commitment::commit(curve, &value_scalar, &blinding, h), blinding)
        }
    };

    let shifted = value - min;
    let bits = n_bits(min, max);

    let mut bit_blindings = Vec::with_capacity(bits as usize);
    let mut bit_commitments = Vec::with_capacity(bits as usize);
    let mut bit_proofs = Vec::with_capacity(bits as usize);

    for i in 0..bits {
        let bit = ((shifted >> i) & 1) as u8;
        let r_bit = Scalar::random(curve, rng);
        let bit_value = Scalar::new(curve, num_bigint::BigUint::from(bit));
        let bit_comm = commitment::commit(curve, &bit_value, &r_bit, h);
        let proof = bit::create(curve, h, &bit_comm, bit, &r_bit, rng);

        bit_blindings.push(r_bit);
        bit_commitments.push(bit_comm);
        bit_proofs.push(proof);
    }

    let mut weighted_blinding = Scalar::zero(curve);
    for (i, r_bit) in bit_blindings.iter().enumerate() {
        let weight = Scalar::new(curve, num_bigint::BigUint::from(1u64) << i);
        weighted_blinding = weighted_blinding.add(&weight.mul(r_bit));
    }
    let blinding_diff = blinding.sub(&weighted_blinding);

    let w_sum = Scalar::random(curve, rng);
    let t_sum = h.mul(&w_sum);
    let c_sum = sum_challenge(curve, &comm, &t_sum);
    let s_sum = w_sum.add(&c_sum.mul(&blinding_diff));

    Ok(RangeProof {
        commitment: comm,
        min,
        max,
        bit_commitments,
        bit_proofs,
        sum_proof: SumProof { t: t_sum, c: c_sum, s: s_sum },
    })
}

pub fn verify(curve: CurveId, h: &Point, proof: &RangeProof) -> Result<(), LedgerError> {
    let bits = n_bits(proof.min, proof.max) as usize;
    if proof.bit_commitments.len() != bits || proof.bit_proofs.len() != bits {
        warn!(proof = "range_proof", "bit count mismatch");
        return Err(ProofFailure::RangeWeightedSum.into());
    }

    for (bit_comm, bit_proof) in proof.bit_commitments.iter().zip(&proof.bit_proofs) {
        bit::verify(curve, h, bit_comm, bit_proof)?;
    }

    let g = Point::generator(curve);
    let mut weighted_commitment = Point::identity(curve);
    for (i, bit_comm) in proof.bit_commitments.iter().enumerate() {
        let weight = Scalar::new(curve, num_bigint::BigUint::from(1u64) << i);
        weighted_commitment = weighted_commitment.add(&bit_comm.mul(&weight));
    }
    let min_scalar = Scalar::new(curve, num_bigint::BigUint::from(proof.min));
    let expected_commitment = weighted_commitment.add(&g.mul(&min_scalar));
    let diff_commitment = proof.commitment.sub(&expected_commitment);

    let expected_c = sum_challenge(curve, &proof.commitment, &proof.sum_proof.t);
    if expected_c != proof.sum_proof.c {
        warn!(proof = "range_proof", "sum-proof challenge mismatch");
        return Err(ProofFailure::RangeWeightedSum.into());
    }

    let t_check = h
        .mul(&proof.sum_proof.s)
        .sub(&diff_commitment.mul(&proof.sum_proof.c));
    if t_check != proof.sum_proof.t {
        warn!(proof = "range_proof", "linking proof failed");
        return Err(ProofFailure::RangeLinking.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(curve: CurveId) -> Point {
        Point::generator(curve).mul(&Scalar::hash_to_scalar(curve, b"test-H"))
    }

    #[test]
    fn value_in_range_verifies() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let h = h(curve);
        for v in [0u64, 1, 17, 10000] {
            let proof = create(curve, &h, v, 0, 10000, None, &mut rng).unwrap();
            assert!(verify(curve, &h, &proof).is_ok(), "value {v} should verify");
        }
    }

    #[test]
    fn value_out_of_range_fails_fast() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let h = h(curve);
        let err = create(curve, &h, 10001, 0, 10000, None, &mut rng).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn tampered_commitment_fails_verification() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let h = h(curve);
        let mut proof = create(curve, &h, 50, 0, 10000, None, &mut rng).unwrap();
        proof.commitment = proof.commitment.add(&Point::generator(curve));
        assert!(verify(curve, &h, &proof).is_err());
    }

    #[test]
    fn supplied_commitment_must_match_value() {
        let curve = CurveId::P192;
        let mut rng = rand::thread_rng();
        let h = h(curve);
        let blinding = Scalar::random(curve, &mut rng);
        let wrong_comm = commitment::commit(
            curve,
            &Scalar::new(curve, num_bigint::BigUint::from(5u32)),
            &blinding,
            &h,
        );
        let err = create(curve, &h, 10, 0, 10000, Some((wrong_comm, blinding)), &mut rng).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }
}
