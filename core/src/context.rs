//! `CryptoContext`: the process-lifetime value that replaces the source's
//! module-level globals (curve singletons, `VALUE_POINTS`, `G_TABLE`).
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::ZKPedersenElGamal.__init__`
//! and `generate_value_table`; threaded through as `Arc<CryptoContext>` per
//! the redesign in SPEC_FULL.md §9.

use std::collections::HashMap;

use num_bigint::BigUint;
use tracing::info;

use crate::curve::{CurveId, Point, Scalar};

/// Domain-separation seed for deriving the second Pedersen generator `H`.
const PEDERSEN_H_GENERATOR_SEED: &[u8] = b"PEDERSEN_H_GENERATOR";

/// Default size of the precomputed plaintext-recovery table.
pub const DEFAULT_VALUE_TABLE_SIZE: u64 = 10_000;

/// Owns `(curve, G, H, value_table)` for its lifetime. `H`'s discrete log
/// base `G` is never retained: it is folded into a point the instant it is
/// derived from the one-way hash of [`PEDERSEN_H_GENERATOR_SEED`].
pub struct CryptoContext {
    pub curve: CurveId,
    pub g: Point,
    pub h: Point,
    /// `(i*G).x -> i` for `i in [0, value_table_size)`.
    value_table: HashMap<BigUint, u64>,
    value_table_size: u64,
}

impl CryptoContext {
    /// Build a fresh context, deriving `H` and the plaintext-recovery table.
    /// The table build is the one expensive step; it runs once here and is
    /// shared read-only afterwards.
    pub fn new(curve: CurveId, value_table_size: u64) -> Self {
        if value_table_size == 0 {
            panic!("CryptoContext requires a non-empty value table");
        }
        let g = Point::generator(curve);
        let h_scalar = Scalar::hash_to_scalar(curve, PEDERSEN_H_GENERATOR_SEED);
        let h = g.mul(&h_scalar);

        info!(size = value_table_size, "building plaintext value table");
        let mut value_table = HashMap::with_capacity(value_table_size as usize);
        let mut point = Point::identity(curve);
        for i in 0..value_table_size {
            value_table.entry(point.x.clone()).or_insert(i);
            point = point.add(&g);
        }

        CryptoContext {
            curve,
            g,
            h,
            value_table,
            value_table_size,
        }
    }

    pub fn with_default_table(curve: CurveId) -> Self {
        Self::new(curve, DEFAULT_VALUE_TABLE_SIZE)
    }

    pub fn value_table_size(&self) -> u64 {
        self.value_table_size
    }

    /// O(1) fallible recovery of a small plaintext value from `v*G`. Values
    /// outside the table return `None`, not an error: they are simply
    /// unrecoverable by this lookup path, by design.
    pub fn lookup(&self, point: &Point) -> Option<u64> {
        if point.is_identity {
            return Some(0);
        }
        self.value_table.get(&point.x).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_recovers_small_values() {
        let ctx = CryptoContext::new(CurveId::P192, 64);
        for i in 0..64u64 {
            let point = ctx.g.mul(&Scalar::new(CurveId::P192, BigUint::from(i)));
            assert_eq!(ctx.lookup(&point), Some(i));
        }
    }

    #[test]
    fn lookup_misses_outside_table() {
        let ctx = CryptoContext::new(CurveId::P192, 8);
        let point = ctx.g.mul(&Scalar::new(CurveId::P192, BigUint::from(1000u32)));
        assert_eq!(ctx.lookup(&point), None);
    }

    #[test]
    fn h_is_independent_looking_generator() {
        let ctx = CryptoContext::new(CurveId::P192, 4);
        assert_ne!(ctx.h, ctx.g);
        assert!(ctx.h.is_on_curve());
    }
}
