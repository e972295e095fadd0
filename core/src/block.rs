//! Blocks: an indexed, proof-of-work-sealed batch of transactions with a
//! Merkle root over its contents.
//!
//! Grounded on `original_source/blockchain/base.py::Block`. The hash commits
//! to `{index, timestamp, merkle_root, previous_hash, nonce}` only — the
//! transaction list is represented solely through `merkle_root`, same as
//! the source.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::merkle::{self, MerkleTree};
use crate::tx::Transaction;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HashedFields<'a> {
    index: u64,
    timestamp: f64,
    merkle_root: &'a str,
    previous_hash: &'a str,
    nonce: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,
    pub merkle_root: String,
    pub hash: String,
}

impl Block {
    pub fn new(index: u64, timestamp: f64, transactions: Vec<Transaction>, previous_hash: String) -> Self {
        let merkle_root = merkle::build(&transactions)
            .expect("transaction serialization cannot fail")
            .root();
        let mut block = Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            merkle_root,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn calculate_hash(&self) -> String {
        let fields = HashedFields {
            index: self.index,
            timestamp: self.timestamp,
            merkle_root: &self.merkle_root,
            previous_hash: &self.previous_hash,
            nonce: self.nonce,
        };
        let digest = merkle::canonical_hash(&fields).expect("hashed fields always serialize");
        merkle::hex_of(&digest)
    }

    fn recalculate_merkle_root(&mut self) {
        self.merkle_root = merkle::build(&self.transactions)
            .expect("transaction serialization cannot fail")
            .root();
        self.hash = self.calculate_hash();
    }

    /// Increment `nonce` until `hash` begins with `difficulty` hex zeros.
    pub fn mine(&mut self, difficulty: u32) {
        let target: String = std::iter::repeat('0').take(difficulty as usize).collect();
        self.hash = self.calculate_hash();
        while !self.hash.starts_with(&target) {
            self.nonce += 1;
            self.hash = self.calculate_hash();
        }
    }

    fn merkle_tree(&self) -> MerkleTree {
        merkle::build(&self.transactions).expect("transaction serialization cannot fail")
    }

    /// Recompute this block's own `hash` and compare; catches any field
    /// mutated after construction.
    pub fn hash_is_consistent(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn merkle_root_is_consistent(&self) -> bool {
        self.merkle_root == self.merkle_tree().root()
    }

    /// Verify inclusion of `tx_id` in this block via its Merkle proof.
    pub fn verify_transaction(&self, tx_id: &str) -> bool {
        let Some(tx) = self.transactions.iter().find(|tx| tx.tx_id() == tx_id) else {
            return false;
        };
        let Ok(leaf_hash) = merkle::canonical_hash(tx).map(|h| merkle::hex_of(&h)) else {
            return false;
        };
        let tree = self.merkle_tree();
        let Some(proof) = tree.proof(&leaf_hash) else {
            return false;
        };
        MerkleTree::verify(&leaf_hash, &proof, &tree.root())
    }
}

/// `SHA-256("COINBASE:<miner>:<timestamp>").hex[0:16]`.
pub fn coinbase_tx_id(miner_address: &str, timestamp: f64) -> String {
    let data = format!("COINBASE:{miner_address}:{timestamp}");
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(digest)[..crate::tx::TX_ID_LENGTH].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::CoinbaseTx;

    fn coinbase(recipient: &str, amount: u64, timestamp: f64) -> Transaction {
        Transaction::Coinbase(CoinbaseTx {
            recipient_address: recipient.to_string(),
            amount,
            timestamp,
            tx_id: coinbase_tx_id(recipient, timestamp),
        })
    }

    #[test]
    fn genesis_block_has_empty_merkle_root() {
        let genesis = Block::new(0, 0.0, Vec::new(), "0".to_string());
        assert_eq!(genesis.merkle_root, merkle::empty_root().unwrap());
        assert!(genesis.hash_is_consistent());
    }

    #[test]
    fn mining_produces_hash_with_requested_leading_zeros() {
        let mut block = Block::new(1, 1000.0, vec![coinbase("Alice", 1, 1000.0)], "0".repeat(64));
        block.mine(2);
        assert!(block.hash.starts_with("00"));
        assert!(block.hash_is_consistent());
    }

    #[test]
    fn verify_transaction_finds_included_tx_and_rejects_absent_one() {
        let txs = vec![coinbase("Alice", 1, 1000.0), coinbase("Bob", 1, 1001.0)];
        let block = Block::new(1, 1000.0, txs, "0".repeat(64));
        assert!(block.verify_transaction(&coinbase_tx_id("Alice", 1000.0)));
        assert!(!block.verify_transaction("nonexistent"));
    }

    #[test]
    fn tampering_with_a_transaction_breaks_merkle_consistency() {
        let mut block = Block::new(
            1,
            1000.0,
            vec![coinbase("Alice", 1, 1000.0), coinbase("Bob", 1, 1001.0)],
            "0".repeat(64),
        );
        if let Transaction::Coinbase(tx) = &mut block.transactions[0] {
            tx.amount = 999;
        }
        assert!(!block.merkle_root_is_consistent());
    }
}
