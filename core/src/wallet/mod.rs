//! Wallets: thin stateful clients over [`crate::state_manager::StateManager`].
//!
//! Grounded on `original_source/blockchain/zk_integration.py::ZKBlockchainWallet`
//! and `ring_integration.py::RingBlockchainWallet`.

pub mod ring;
pub mod zk;

/// One entry in a wallet's local transaction history.
#[derive(Clone, Debug, serde::Serialize)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub counterparty: String,
    pub amount: u64,
    pub tx_id: String,
    pub timestamp: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}
