//! `LedgerConfig`: plain struct bundling every knob a caller can vary at
//! construction time. No global mutable configuration state exists
//! anywhere in this crate — every component that needs a setting receives
//! it through a constructor argument.
//!
//! Grounded on `cli/src/config.rs`'s "struct of knobs, no globals" shape,
//! adapted to this crate's own settings.

use crate::curve::CurveId;

/// Default mining difficulty: number of leading hex zero nibbles a block
/// hash must have.
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Default size of the plaintext-recovery value table.
pub const DEFAULT_VALUE_TABLE_SIZE: u64 = 10_000;

/// Default inclusive range used by transaction range proofs.
pub const TX_MIN_AMOUNT: u64 = 0;
pub const TX_MAX_AMOUNT: u64 = 10_000;

/// Default interval between background scanner passes.
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 1_000;

/// Bound on how long the background scanner is given to stop.
pub const SCANNER_STOP_TIMEOUT_MS: u64 = 2_000;

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub curve: CurveId,
    pub difficulty: u32,
    pub value_table_size: u64,
    pub tx_min_amount: u64,
    pub tx_max_amount: u64,
    pub scan_interval_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            curve: CurveId::P256,
            difficulty: DEFAULT_DIFFICULTY,
            value_table_size: DEFAULT_VALUE_TABLE_SIZE,
            tx_min_amount: TX_MIN_AMOUNT,
            tx_max_amount: TX_MAX_AMOUNT,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
        }
    }
}

impl LedgerConfig {
    /// Demo/test scale: the smaller P-192 curve keeps proof generation fast
    /// enough to run many end-to-end passes in tests.
    pub fn demo() -> Self {
        LedgerConfig {
            curve: CurveId::P192,
            ..LedgerConfig::default()
        }
    }
}
