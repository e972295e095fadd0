//! Thread-safe wrapper around [`Blockchain`]: mempool, listener registry,
//! ring anonymity-set registry, all behind one reentrant lock.
//!
//! Grounded on `original_source/blockchain/state_manager.py::BlockchainStateManager`.
//! `parking_lot::ReentrantMutex<RefCell<_>>` replaces the source's
//! `threading.RLock` guarding plain attribute mutation (SPEC_FULL.md §5):
//! listeners invoked from inside `mine_block` may re-enter read operations
//! on the same thread, which a reentrant lock permits and a plain `Mutex`
//! would deadlock on.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::block::Block;
use crate::chain::{Blockchain, ChainSnapshot};
use crate::curve::{CurveId, Point};
use crate::error::Result;
use crate::keys::Keypair;
use crate::tx::Transaction;

/// Events a listener can subscribe to, matched in `notify` by name so new
/// event kinds don't force every existing listener to handle a new variant.
pub enum Event {
    BlockMined(Block),
    MempoolUpdated(usize),
    StateLoaded(usize),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::BlockMined(_) => "block_mined",
            Event::MempoolUpdated(_) => "mempool_updated",
            Event::StateLoaded(_) => "state_loaded",
        }
    }
}

pub type Listener = Box<dyn Fn(&Event) + Send>;

#[derive(Debug, Clone, serde::Serialize)]
pub struct StateSummary {
    pub chain_length: usize,
    pub last_block_hash: String,
    pub pending_transactions: usize,
    pub mempool_size: usize,
    pub difficulty: u32,
}

struct StateManagerInner {
    chain: Blockchain,
    mempool: Vec<Transaction>,
    listeners: Vec<(&'static str, Listener)>,
    public_keys_registry: Vec<Point>,
}

pub struct StateManager {
    inner: ReentrantMutex<RefCell<StateManagerInner>>,
    curve: CurveId,
}

impl StateManager {
    pub fn new(curve: CurveId, difficulty: u32) -> Self {
        StateManager {
            inner: ReentrantMutex::new(RefCell::new(StateManagerInner {
                chain: Blockchain::new(difficulty),
                mempool: Vec::new(),
                listeners: Vec::new(),
                public_keys_registry: Vec::new(),
            })),
            curve,
        }
    }

    /// Append to the mempool; no deduplication (matching the source).
    pub fn add_transaction(&self, tx: Transaction) {
        let len = {
            let guard = self.inner.lock();
            let mut inner = guard.borrow_mut();
            inner.mempool.push(tx);
            inner.mempool.len()
        };
        self.notify(&Event::MempoolUpdated(len));
    }

    /// Drain the mempool into the chain's pending list, append the coinbase
    /// reward, mine, and fire `block_mined`. Always produces a block, even
    /// with an empty mempool (§4.9): the coinbase reward alone is valid.
    pub fn mine_block(&self, miner_address: &str) -> Block {
        let mined = {
            let guard = self.inner.lock();
            let mut inner = guard.borrow_mut();
            for tx in std::mem::take(&mut inner.mempool) {
                inner.chain.add_transaction(tx);
            }
            inner.chain.mine_pending_transactions(miner_address).clone()
        };
        info!(index = mined.index, "block mined");
        self.notify(&Event::BlockMined(mined.clone()));
        mined
    }

    pub fn scan_for_address(&self, address: &str) -> Vec<(u64, String, Transaction)> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner
            .chain
            .scan_for_transactions(address)
            .into_iter()
            .map(|(idx, hash, tx)| (idx, hash, tx.clone()))
            .collect()
    }

    /// Chain blocks plus mempool, matching `sender_address` or
    /// `recipient_address`. Supplements `scan_for_address` with the
    /// not-yet-mined view.
    pub fn get_transactions_for_address(&self, address: &str) -> Vec<Transaction> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        let mut found: Vec<Transaction> = inner
            .chain
            .chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.sender_address() == address || tx.recipient_address() == address)
            .cloned()
            .collect();
        found.extend(
            inner
                .mempool
                .iter()
                .filter(|tx| tx.sender_address() == address || tx.recipient_address() == address)
                .cloned(),
        );
        found
    }

    pub fn get_all_transactions(&self) -> Vec<Transaction> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner
            .chain
            .chain
            .iter()
            .flat_map(|block| block.transactions.iter().cloned())
            .chain(inner.mempool.iter().cloned())
            .collect()
    }

    pub fn get_state_summary(&self) -> StateSummary {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        StateSummary {
            chain_length: inner.chain.chain.len(),
            last_block_hash: inner.chain.latest_block().hash.clone(),
            pending_transactions: inner.chain.pending_transactions.len(),
            mempool_size: inner.mempool.len(),
            difficulty: inner.chain.difficulty,
        }
    }

    pub fn verify_chain(&self) -> Result<()> {
        let guard = self.inner.lock();
        guard.borrow().chain.verify_chain()
    }

    pub fn verify_transaction(&self, tx_id: &str) -> Option<(u64, usize, bool)> {
        let guard = self.inner.lock();
        guard.borrow().chain.verify_transaction(tx_id)
    }

    pub fn register_public_key(&self, pk: Point) {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if !inner.public_keys_registry.contains(&pk) {
            inner.public_keys_registry.push(pk);
        }
    }

    /// Sample `n` public keys excluding `exclude`, generating ephemeral
    /// keypairs to fill the registry out if it's too short.
    pub fn get_random_public_keys(&self, n: usize, exclude: &[Point], rng: &mut impl rand::RngCore) -> Vec<Point> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        let mut available: Vec<Point> = inner
            .public_keys_registry
            .iter()
            .filter(|pk| !exclude.contains(pk))
            .cloned()
            .collect();

        while available.len() < n {
            let ephemeral = Keypair::generate(self.curve, rng);
            inner.public_keys_registry.push(ephemeral.public().clone());
            available.push(ephemeral.public().clone());
        }

        available.shuffle(rng);
        available.truncate(n);
        available
    }

    pub fn add_listener(&self, event: &'static str, callback: Listener) {
        let guard = self.inner.lock();
        guard.borrow_mut().listeners.push((event, callback));
    }

    /// Synchronous fan-out under the lock. A panicking listener is caught
    /// and logged; it neither poisons the lock nor aborts the caller.
    fn notify(&self, event: &Event) {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        for (name, callback) in &inner.listeners {
            if *name == event.name() {
                if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                    warn!(event = event.name(), "listener panicked; ignoring");
                }
            }
        }
    }

    pub fn save_state(&self, path: &Path) -> Result<()> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        let snapshot = ChainSnapshot {
            chain: inner.chain.chain.clone(),
            pending_transactions: inner.mempool.clone(),
            difficulty: inner.chain.difficulty,
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_state(&self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        let snapshot: ChainSnapshot = serde_json::from_slice(&bytes)?;
        let chain_len = snapshot.chain.len();
        {
            let guard = self.inner.lock();
            let mut inner = guard.borrow_mut();
            inner.mempool = snapshot.pending_transactions;
            inner.chain = Blockchain::from_snapshot(ChainSnapshot {
                chain: snapshot.chain,
                pending_transactions: Vec::new(),
                difficulty: snapshot.difficulty,
            });
        }
        self.notify(&Event::StateLoaded(chain_len));
        Ok(())
    }
}

/// A single cooperative background loop on a configurable interval.
/// Cancellation flips a stop flag; the loop polls it in small slices so
/// `stop()` returns within roughly one slice regardless of `interval`.
pub struct BackgroundScanner {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

const STOP_POLL_SLICE: Duration = Duration::from_millis(100);

impl BackgroundScanner {
    pub fn spawn(interval: Duration, mut tick: impl FnMut() + Send + 'static) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let handle = std::thread::spawn(move || {
            while !stop_for_thread.load(Ordering::Relaxed) {
                tick();
                let mut waited = Duration::ZERO;
                while waited < interval {
                    if stop_for_thread.load(Ordering::Relaxed) {
                        return;
                    }
                    let slice = STOP_POLL_SLICE.min(interval - waited);
                    std::thread::sleep(slice);
                    waited += slice;
                }
            }
        });
        BackgroundScanner { stop, handle: Some(handle) }
    }

    /// Flip the stop flag and join with a bounded wait (SPEC_FULL.md §5: ≤2s).
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundScanner {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{zk_address, CoinbaseTx};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn mining_fires_block_mined_listener() {
        let sm = StateManager::new(CurveId::P192, 1);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        sm.add_listener(
            "block_mined",
            Box::new(move |_event| {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        sm.add_transaction(Transaction::Coinbase(CoinbaseTx {
            recipient_address: "Bob".to_string(),
            amount: 2,
            timestamp: 1000.0,
            tx_id: "abc".to_string(),
        }));
        sm.mine_block("Alice");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_poison_state() {
        let sm = StateManager::new(CurveId::P192, 1);
        sm.add_listener("block_mined", Box::new(|_event| panic!("boom")));

        sm.add_transaction(Transaction::Coinbase(CoinbaseTx {
            recipient_address: "Bob".to_string(),
            amount: 2,
            timestamp: 1000.0,
            tx_id: "abc".to_string(),
        }));
        sm.mine_block("Alice");
        // state manager still usable after a listener panic
        assert_eq!(sm.get_state_summary().chain_length, 2);
    }

    #[test]
    fn random_public_keys_excludes_requested_and_fills_shortfall() {
        let sm = StateManager::new(CurveId::P192, 1);
        let mut rng = rand::thread_rng();
        let kp = Keypair::generate(CurveId::P192, &mut rng);
        sm.register_public_key(kp.public().clone());

        let picked = sm.get_random_public_keys(3, &[kp.public().clone()], &mut rng);
        assert_eq!(picked.len(), 3);
        assert!(!picked.contains(kp.public()));
    }

    #[test]
    fn background_scanner_ticks_and_stops_promptly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let scanner = BackgroundScanner::spawn(Duration::from_millis(20), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(80));
        scanner.stop();
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn get_transactions_for_address_includes_mempool() {
        let sm = StateManager::new(CurveId::P192, 1);
        let addr = zk_address(&Point::generator(CurveId::P192));
        sm.add_transaction(Transaction::Coinbase(CoinbaseTx {
            recipient_address: addr.clone(),
            amount: 1,
            timestamp: 1000.0,
            tx_id: "tx1".to_string(),
        }));
        let found = sm.get_transactions_for_address(&addr);
        assert_eq!(found.len(), 1);
    }
}
