//! OR-proof that a Pedersen commitment opens to either `0` or `1`.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::create_bit_proof`
//! / `verify_bit_proof`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::curve::{CurveId, Point, Scalar};
use crate::error::{LedgerError, ProofFailure};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BitProof {
    pub t0: Point,
    pub t1: Point,
    pub c: Scalar,
    pub c0: Scalar,
    pub s0: Scalar,
    pub c1: Scalar,
    pub s1: Scalar,
}

fn challenge(curve: CurveId, bit_comm: &Point, t0: &Point, t1: &Point) -> Scalar {
    let data = format!(
        "{}:{}:{}:{}:{}:{}",
        bit_comm.x_decimal(),
        bit_comm.y_decimal(),
        t0.x_decimal(),
        t0.y_decimal(),
        t1.x_decimal(),
        t1.y_decimal(),
    );
    Scalar::hash_to_scalar(curve, data.as_bytes())
}

/// `bit_comm = bit*G + r_bit*H`. Proves `bit in {0, 1}` without revealing it.
pub fn create(
    curve: CurveId,
    h: &Point,
    bit_comm: &Point,
    bit: u8,
    r_bit: &Scalar,
    rng: &mut impl rand::RngCore,
) -> BitProof {
    let g = Point::generator(curve);
    if bit == 0 {
        let w0 = Scalar::random(curve, rng);
        let t0 = h.mul(&w0);

        let c1 = Scalar::random(curve, rng);
        let s1 = Scalar::random(curve, rng);
        let t1 = h.mul(&s1).sub(&bit_comm.sub(&g).mul(&c1));

        let c = challenge(curve, bit_comm, &t0, &t1);
        let c0 = c.sub(&c1);
        let s0 = w0.add(&c0.mul(r_bit));

        BitProof { t0, t1, c, c0, s0, c1, s1 }
    } else {
        let w1 = Scalar::random(curve, rng);
        let t1 = h.mul(&w1);

        let c0 = Scalar::random(curve, rng);
        let s0 = Scalar::random(curve, rng);
        let t0 = h.mul(&s0).sub(&bit_comm.mul(&c0));

        let c = challenge(curve, bit_comm, &t0, &t1);
        let c1 = c.sub(&c0);
        let s1 = w1.add(&c1.mul(r_bit));

        BitProof { t0, t1, c, c0, s0, c1, s1 }
    }
}

pub fn verify(curve: CurveId, h: &Point, bit_comm: &Point, proof: &BitProof) -> Result<(), LedgerError> {
    let g = Point::generator(curve);

    if proof.c0.add(&proof.c1) != proof.c {
        warn!(proof = "bit_proof", "subchallenge sum mismatch");
        return Err(ProofFailure::BitChallengeSum.into());
    }

    let recomputed = challenge(curve, bit_comm, &proof.t0, &proof.t1);
    if recomputed != proof.c {
        warn!(proof = "bit_proof", "challenge recomputation mismatch");
        return Err(ProofFailure::BitChallengeRecompute.into());
    }

    let t0_check = h.mul(&proof.s0).sub(&bit_comm.mul(&proof.c0));
    let t1_check = h.mul(&proof.s1).sub(&bit_comm.sub(&g).mul(&proof.c1));

    if t0_check != proof.t0 || t1_check != proof.t1 {
        warn!(proof = "bit_proof", "verification equation failed");
        return Err(ProofFailure::BitEquation.into());
    }

    Ok(())
}
