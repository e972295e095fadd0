//! Merkle tree over a block's transaction set, for per-block inclusion
//! proofs and tamper detection.
//!
//! Grounded on `original_source/utils/merkle.py`. Canonical JSON is produced
//! by routing each transaction through `serde_json::Value` (backed by
//! `BTreeMap`, so keys end up lexicographically sorted) rather than
//! serializing the struct directly, which would preserve declaration order.

use serde::Serialize;
use serde::{Deserialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Canonical-JSON SHA-256 of any serializable value: re-encode through
/// `serde_json::Value` so struct field order never leaks into the hash.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<[u8; 32]> {
    let as_value = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&as_value)?;
    Ok(Sha256::digest(bytes).into())
}

pub fn hex_of(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut combined = String::with_capacity(left.len() + right.len());
    combined.push_str(left);
    combined.push_str(right);
    hex_of(&Sha256::digest(combined.as_bytes()).into())
}

/// `{position, hash}` step of a Merkle proof, leaf to root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub position: Position,
    pub hash: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(match self {
            Position::Left => "left",
            Position::Right => "right",
        })
    }
}

/// Bottom-up binary Merkle tree. Odd levels duplicate their last node.
pub struct MerkleTree {
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Build from transaction hashes already computed via [`canonical_hash`].
    /// An empty leaf set yields `SHA-256("")` as its root.
    pub fn new(leaf_hashes: Vec<String>) -> Self {
        if leaf_hashes.is_empty() {
            let empty_root = hex_of(&Sha256::digest(b"").into());
            return MerkleTree { levels: vec![vec![empty_root]] };
        }

        let mut level = leaf_hashes;
        let mut levels = vec![level.clone()];

        while levels.len() == 1 || level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                next.push(hash_pair(left, right));
            }
            levels.push(next.clone());
            level = next;
        }

        MerkleTree { levels }
    }

    pub fn root(&self) -> String {
        self.levels.last().unwrap()[0].clone()
    }

    /// Locate `leaf_hash` among the original leaves (before odd-count
    /// duplication) and emit the sibling path to the root.
    pub fn proof(&self, leaf_hash: &str) -> Option<Vec<ProofStep>> {
        let leaves = self.levels.first()?;
        let mut index = leaves.iter().position(|h| h == leaf_hash)?;

        let mut proof = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
            let sibling = level.get(sibling_index).unwrap_or(&level[index]);
            let position = if index % 2 == 0 { Position::Right } else { Position::Left };
            proof.push(ProofStep { position, hash: sibling.clone() });
            index /= 2;
        }
        Some(proof)
    }

    pub fn verify(leaf_hash: &str, proof: &[ProofStep], root: &str) -> bool {
        let mut current = leaf_hash.to_string();
        for step in proof {
            current = match step.position {
                Position::Left => hash_pair(&step.hash, &current),
                Position::Right => hash_pair(&current, &step.hash),
            };
        }
        current == root
    }
}

/// Build a tree directly from serializable transactions, hashing each one
/// canonically first.
pub fn build<T: Serialize>(transactions: &[T]) -> Result<MerkleTree> {
    let leaf_hashes = transactions
        .iter()
        .map(|tx| canonical_hash(tx).map(|h| hex_of(&h)))
        .collect::<Result<Vec<_>>>()?;
    Ok(MerkleTree::new(leaf_hashes))
}

pub fn empty_root() -> Result<String> {
    Ok(MerkleTree::new(Vec::new()).root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Tx {
        sender: String,
        recipient: String,
        amount: u64,
        tx_id: String,
    }

    fn sample_txs() -> Vec<Tx> {
        (0..6)
            .map(|i| Tx {
                sender: format!("User{i}"),
                recipient: format!("User{}", (i + 1) % 6),
                amount: 10 * (i + 1),
                tx_id: format!("tx_{i}"),
            })
            .collect()
    }

    #[test]
    fn empty_tree_root_is_hash_of_empty_string() {
        let tree = MerkleTree::new(Vec::new());
        assert_eq!(tree.root(), hex_of(&Sha256::digest(b"").into()));
    }

    #[test]
    fn proof_round_trips_for_every_leaf() {
        let txs = sample_txs();
        let tree = build(&txs).unwrap();
        let root = tree.root();

        for tx in &txs {
            let leaf = hex_of(&canonical_hash(tx).unwrap());
            let proof = tree.proof(&leaf).unwrap();
            assert!(MerkleTree::verify(&leaf, &proof, &root));
        }
    }

    #[test]
    fn tampering_breaks_an_old_proof() {
        let mut txs = sample_txs();
        let tree = build(&txs).unwrap();
        let root = tree.root();
        let old_leaf = hex_of(&canonical_hash(&txs[2]).unwrap());
        let old_proof = tree.proof(&old_leaf).unwrap();

        txs[2].amount = 999;
        let new_leaf = hex_of(&canonical_hash(&txs[2]).unwrap());

        assert!(!MerkleTree::verify(&new_leaf, &old_proof, &root));
        assert_ne!(old_leaf, new_leaf);
    }

    #[test]
    fn odd_leaf_count_duplicates_last_leaf() {
        let txs: Vec<Tx> = sample_txs().into_iter().take(5).collect();
        let tree = build(&txs).unwrap();
        assert!(tree.levels[0].len() == 5);
        // still produces a well-formed proof for every original leaf
        for tx in &txs {
            let leaf = hex_of(&canonical_hash(tx).unwrap());
            let proof = tree.proof(&leaf).unwrap();
            assert!(MerkleTree::verify(&leaf, &proof, &tree.root()));
        }
    }
}
