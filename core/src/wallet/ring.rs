//! Ring wallet: dual view/spend keys, stealth-addressed receiving, ring
//! signatures for sender anonymity.
//!
//! Grounded on `original_source/blockchain/ring_integration.py::RingBlockchainWallet`
//! and `original_source/schemes/ring_pedersen_elgamal.py`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::RngCore;
use tracing::warn;

use crate::chain::now_seconds;
use crate::context::CryptoContext;
use crate::curve::CurveId;
use crate::elgamal;
use crate::error::{LedgerError, Result};
use crate::keys::Keypair;
use crate::ring as ring_sig;
use crate::state_manager::StateManager;
use crate::stealth;
use crate::tx::{self, RingTx, Transaction};
use crate::wallet::{Direction, HistoryEntry};

/// Ring members borrowed from the registry beyond the sender's own key.
const RING_DECOYS: usize = 3;

struct RingWalletState {
    balance: u64,
    history: Vec<HistoryEntry>,
    processed: HashSet<String>,
}

pub struct RingWallet {
    ctx: Arc<CryptoContext>,
    curve: CurveId,
    view: Keypair,
    spend: Keypair,
    pub address: String,
    state: Mutex<RingWalletState>,
}

fn ring_signature_message(sender_address: &str, recipient_address: &str, timestamp: f64) -> String {
    format!("{sender_address}:{recipient_address}:{timestamp}")
}

impl RingWallet {
    pub fn new(ctx: Arc<CryptoContext>, rng: &mut impl RngCore) -> Arc<Self> {
        let curve = ctx.curve;
        let view = Keypair::generate(curve, rng);
        let spend = Keypair::generate(curve, rng);
        let address = tx::ring_address(view.public(), spend.public());

        Arc::new(RingWallet {
            ctx,
            curve,
            view,
            spend,
            address,
            state: Mutex::new(RingWalletState {
                balance: 0,
                history: Vec::new(),
                processed: HashSet::new(),
            }),
        })
    }

    pub fn view_public_key(&self) -> &crate::curve::Point {
        self.view.public()
    }

    pub fn spend_public_key(&self) -> &crate::curve::Point {
        self.spend.public()
    }

    pub fn balance(&self) -> u64 {
        self.state.lock().balance
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().history.clone()
    }

    pub fn register(self: &Arc<Self>, state_manager: &Arc<StateManager>) {
        state_manager.register_public_key(self.spend.public().clone());
        let wallet = self.clone();
        let sm = state_manager.clone();
        state_manager.add_listener(
            "block_mined",
            Box::new(move |_event| wallet.scan_for_transactions(&sm)),
        );
    }

    /// Generate a one-time stealth address for the recipient, encrypt the
    /// amount under their view key, borrow decoys from the registry, and
    /// sign with a ring signature before submitting.
    pub fn send_transaction(
        &self,
        state_manager: &StateManager,
        recipient_view_pk: &crate::curve::Point,
        recipient_spend_pk: &crate::curve::Point,
        amount: u64,
        rng: &mut impl RngCore,
    ) -> Result<String> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput("amount must be positive".into()));
        }

        let mut state = self.state.lock();
        if amount > state.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: state.balance as i64,
                amount: amount as i64,
            });
        }

        let stealth = stealth::generate(self.curve, recipient_view_pk, recipient_spend_pk, rng);
        let recipient_address = tx::stealth_recipient_marker(&stealth.p);
        let (encrypted_amount, _) = elgamal::encrypt(self.curve, amount, recipient_view_pk, None, rng);

        let mut ring_members = state_manager.get_random_public_keys(RING_DECOYS, &[self.spend.public().clone()], rng);
        ring_members.push(self.spend.public().clone());
        let signer_idx = ring_members.len() - 1;

        let timestamp = now_seconds();
        let message = ring_signature_message(&self.address, &recipient_address, timestamp);
        let ring_signature = ring_sig::sign(
            self.curve,
            &message,
            signer_idx,
            &ring_members,
            &self.spend.secret(),
            rng,
        );

        let tx_id = tx::derive_tx_id(&self.address, &recipient_address, timestamp);
        let ring_tx = RingTx {
            sender_address: self.address.clone(),
            recipient_address: recipient_address.clone(),
            stealth_r: stealth.r,
            stealth_p: stealth.p,
            encrypted_amount,
            ring_signature,
            ring_members,
            timestamp,
            tx_id: tx_id.clone(),
        };

        state_manager.add_transaction(Transaction::Ring(ring_tx));

        state.balance -= amount;
        state.history.push(HistoryEntry {
            direction: Direction::Sent,
            counterparty: recipient_address,
            amount,
            tx_id: tx_id.clone(),
            timestamp,
        });
        state.processed.insert(tx_id.clone());

        Ok(tx_id)
    }

    /// Scan every transaction (stealth addresses carry no recipient hint
    /// beyond the marker prefix); recompute ownership with `view_sk` and
    /// decrypt ones that match.
    pub fn scan_for_transactions(&self, state_manager: &StateManager) {
        let candidates = state_manager.get_all_transactions();
        let mut state = self.state.lock();

        for candidate in candidates {
            if state.processed.contains(candidate.tx_id()) {
                continue;
            }

            match &candidate {
                Transaction::Coinbase(coinbase) if coinbase.recipient_address == self.address => {
                    state.balance += coinbase.amount;
                    state.history.push(HistoryEntry {
                        direction: Direction::Received,
                        counterparty: "COINBASE".to_string(),
                        amount: coinbase.amount,
                        tx_id: coinbase.tx_id.clone(),
                        timestamp: coinbase.timestamp,
                    });
                    state.processed.insert(coinbase.tx_id.clone());
                }
                Transaction::Ring(ring_tx) => {
                    if !ring_tx.recipient_address.starts_with("stealth:") {
                        continue;
                    }
                    let owns = stealth::recover(
                        &ring_tx.stealth_r,
                        &ring_tx.stealth_p,
                        &self.view.secret(),
                        self.spend.public(),
                    );
                    if !owns {
                        continue;
                    }

                    let message =
                        ring_signature_message(&ring_tx.sender_address, &ring_tx.recipient_address, ring_tx.timestamp);
                    if !ring_sig::verify(self.curve, &message, &ring_tx.ring_members, &ring_tx.ring_signature) {
                        warn!(tx_id = %ring_tx.tx_id, "incoming ring transaction failed signature verification");
                        continue;
                    }

                    match elgamal::decrypt(&self.ctx, &ring_tx.encrypted_amount, &self.view.secret()) {
                        Some(amount) => {
                            state.balance += amount;
                            state.history.push(HistoryEntry {
                                direction: Direction::Received,
                                counterparty: ring_tx.sender_address.clone(),
                                amount,
                                tx_id: ring_tx.tx_id.clone(),
                                timestamp: ring_tx.timestamp,
                            });
                            state.processed.insert(ring_tx.tx_id.clone());
                        }
                        None => {
                            warn!(tx_id = %ring_tx.tx_id, "received amount outside plaintext value table");
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
