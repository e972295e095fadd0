//! Error taxonomy for the confidential-transaction core.
//!
//! Every fallible operation in this crate returns [`LedgerError`]. Lookup
//! misses (a missing `tx_id`, an unmapped value-table entry) are modeled as
//! `Option`/`Ok(None)` at the call site rather than as an error variant here,
//! since they are expected, non-fatal outcomes.

use thiserror::Error;

/// Reason a zero-knowledge proof failed to verify.
///
/// Kept separate from [`LedgerError::InvalidProof`]'s message so callers can
/// match on *which* sub-check failed without parsing strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ProofFailure {
    #[error("bit-proof subchallenge sum mismatch")]
    BitChallengeSum,
    #[error("bit-proof challenge recomputation mismatch")]
    BitChallengeRecompute,
    #[error("bit-proof verification equation failed")]
    BitEquation,
    #[error("range-proof weighted-sum commitment mismatch")]
    RangeWeightedSum,
    #[error("range-proof linking proof failed")]
    RangeLinking,
    #[error("equality-proof reconstructed nonce mismatch")]
    EqualityNonce,
    #[error("subtraction relation does not hold coordinate-wise")]
    SubtractionRelation,
    #[error("schnorr signature verification failed")]
    SchnorrSignature,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient funds: balance {balance} < amount {amount}")]
    InsufficientFunds { balance: i64, amount: i64 },

    #[error("invalid proof: {0}")]
    InvalidProof(#[from] ProofFailure),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("chain inconsistency: {0}")]
    ChainInconsistency(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
