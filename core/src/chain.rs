//! The chain itself: genesis, mining, and the verification/query surface
//! `state_manager.rs` wraps behind a lock.
//!
//! Grounded on `original_source/blockchain/base.py::Blockchain`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::block::{coinbase_tx_id, Block};
use crate::error::{LedgerError, Result};
use crate::tx::{CoinbaseTx, Transaction};

pub const COINBASE_REWARD: u64 = 1;

pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs_f64()
}

#[derive(Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
    pub difficulty: u32,
}

pub struct Blockchain {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
    pub difficulty: u32,
}

impl Blockchain {
    pub fn new(difficulty: u32) -> Self {
        let genesis = Block::new(0, now_seconds(), Vec::new(), "0".to_string());
        Blockchain {
            chain: vec![genesis],
            pending_transactions: Vec::new(),
            difficulty,
        }
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.last().expect("chain always holds at least its genesis block")
    }

    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.pending_transactions.push(transaction);
    }

    /// Move the mempool into a freshly mined block, appending a coinbase
    /// reward to `miner_address`. Always produces a block, even with an
    /// empty mempool: the coinbase reward alone is a valid block (§4.9).
    pub fn mine_pending_transactions(&mut self, miner_address: &str) -> &Block {
        let timestamp = now_seconds();
        let reward = Transaction::Coinbase(CoinbaseTx {
            recipient_address: miner_address.to_string(),
            amount: COINBASE_REWARD,
            timestamp,
            tx_id: coinbase_tx_id(miner_address, timestamp),
        });

        let mut transactions = std::mem::take(&mut self.pending_transactions);
        transactions.push(reward);

        let latest = self.latest_block();
        let mut block = Block::new(latest.index + 1, timestamp, transactions, latest.hash.clone());
        block.mine(self.difficulty);

        self.chain.push(block);
        self.chain.last().expect("just pushed")
    }

    /// Recompute every block's own hash and Merkle root, and check that the
    /// chain of `previous_hash` links holds.
    pub fn verify_chain(&self) -> Result<()> {
        for i in 1..self.chain.len() {
            let current = &self.chain[i];
            let previous = &self.chain[i - 1];

            if !current.hash_is_consistent() {
                return Err(LedgerError::ChainInconsistency(format!(
                    "block {} hash does not match its recomputed hash",
                    current.index
                )));
            }
            if current.previous_hash != previous.hash {
                return Err(LedgerError::ChainInconsistency(format!(
                    "block {} does not chain to block {}",
                    current.index, previous.index
                )));
            }
            if !current.merkle_root_is_consistent() {
                return Err(LedgerError::ChainInconsistency(format!(
                    "block {} merkle root does not match its transactions",
                    current.index
                )));
            }
        }
        Ok(())
    }

    /// `(block_index, tx_index)` of `tx_id`'s inclusion proof, verified
    /// against that block's Merkle root. `None` if not found anywhere on
    /// the chain — an explicit miss, not an error.
    pub fn verify_transaction(&self, tx_id: &str) -> Option<(u64, usize, bool)> {
        for block in &self.chain {
            if let Some(tx_index) = block.transactions.iter().position(|tx| tx.tx_id() == tx_id) {
                return Some((block.index, tx_index, block.verify_transaction(tx_id)));
            }
        }
        None
    }

    pub fn scan_for_transactions(&self, address: &str) -> Vec<(u64, String, &Transaction)> {
        let mut found = Vec::new();
        for block in &self.chain {
            for tx in &block.transactions {
                if tx.sender_address() == address || tx.recipient_address() == address {
                    found.push((block.index, block.hash.clone(), tx));
                }
            }
        }
        found
    }

    /// Sum of coinbase rewards paid to `address` minus none spent (coinbase
    /// outputs never have a plaintext sender side) — the only balance
    /// derivable from on-chain data without a private key. ZK and ring
    /// transfers are confidential by construction and are excluded.
    pub fn get_balance(&self, address: &str) -> u64 {
        let mut balance: i64 = 0;
        for block in &self.chain {
            for tx in &block.transactions {
                if let Transaction::Coinbase(coinbase) = tx {
                    if coinbase.recipient_address == address {
                        balance += coinbase.amount as i64;
                    }
                }
            }
        }
        balance.max(0) as u64
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            pending_transactions: self.pending_transactions.clone(),
            difficulty: self.difficulty,
        }
    }

    pub fn from_snapshot(snapshot: ChainSnapshot) -> Self {
        Blockchain {
            chain: snapshot.chain,
            pending_transactions: snapshot.pending_transactions,
            difficulty: snapshot.difficulty,
        }
    }
}
