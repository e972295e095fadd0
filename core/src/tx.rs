//! Transactions: a tagged variant replacing the source's duck-typed,
//! dict-shaped transactions (SPEC_FULL.md §9 redesign flag).
//!
//! Grounded on `original_source/blockchain/zk_integration.py::ZKTransaction`
//! and `blockchain/ring_integration.py::RingTransaction`, plus the coinbase
//! shape inlined in `blockchain/state_manager.py::mine_block`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::CryptoContext;
use crate::curve::{Point, Scalar};
use crate::elgamal::Ciphertext;
use crate::error::{LedgerError, Result};
use crate::proofs::{equality::EqualityProof, range::RangeProof, schnorr::SchnorrSignature};
use crate::ring::RingSignature;

pub const TX_ID_LENGTH: usize = 16;

/// `SHA-256("<sender>:<recipient>:<timestamp>").hex[0:16]`.
pub fn derive_tx_id(sender: &str, recipient: &str, timestamp: f64) -> String {
    let data = format!("{sender}:{recipient}:{timestamp}");
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(digest)[..TX_ID_LENGTH].to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AmountProof {
    pub range_proof: RangeProof,
    pub equality_proof: EqualityProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceProof {
    pub remaining_balance_ciphertext: Ciphertext,
    pub range_proof: RangeProof,
    pub equality_proof: EqualityProof,
    pub subtraction_proof: crate::proofs::subtraction::SubtractionProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoinbaseTx {
    pub recipient_address: String,
    pub amount: u64,
    pub timestamp: f64,
    pub tx_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZkTx {
    pub sender_address: String,
    pub recipient_address: String,
    pub ciphertext: Ciphertext,
    pub amount_proof: AmountProof,
    pub balance_proof: Option<BalanceProof>,
    pub signature: SchnorrSignature,
    pub timestamp: f64,
    pub tx_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RingTx {
    pub sender_address: String,
    pub recipient_address: String,
    pub stealth_r: Point,
    pub stealth_p: Point,
    pub encrypted_amount: Ciphertext,
    pub ring_signature: RingSignature,
    pub ring_members: Vec<Point>,
    pub timestamp: f64,
    pub tx_id: String,
}

/// A tagged transaction. Verification dispatches on the tag rather than
/// duck-typing a dict.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction {
    Coinbase(CoinbaseTx),
    Zk(ZkTx),
    Ring(RingTx),
}

impl Transaction {
    pub fn sender_address(&self) -> &str {
        match self {
            Transaction::Coinbase(_) => "COINBASE",
            Transaction::Zk(tx) => &tx.sender_address,
            Transaction::Ring(tx) => &tx.sender_address,
        }
    }

    pub fn recipient_address(&self) -> &str {
        match self {
            Transaction::Coinbase(tx) => &tx.recipient_address,
            Transaction::Zk(tx) => &tx.recipient_address,
            Transaction::Ring(tx) => &tx.recipient_address,
        }
    }

    pub fn tx_id(&self) -> &str {
        match self {
            Transaction::Coinbase(tx) => &tx.tx_id,
            Transaction::Zk(tx) => &tx.tx_id,
            Transaction::Ring(tx) => &tx.tx_id,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            Transaction::Coinbase(tx) => tx.timestamp,
            Transaction::Zk(tx) => tx.timestamp,
            Transaction::Ring(tx) => tx.timestamp,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, Transaction::Coinbase(_))
    }
}

/// Canonical message a `ZkTx`'s signature binds: sender/recipient,
/// ciphertext points, proof commitments, subtraction hash — the
/// "full-message" Schnorr binding SPEC_FULL.md §9 settles on, not the
/// message-less PoK the source's weaker variant uses.
pub fn zk_signature_message(
    recipient_pk: &Point,
    ciphertext: &Ciphertext,
    amount_proof: &AmountProof,
    balance_proof: Option<&BalanceProof>,
) -> String {
    let mut parts = vec![
        format!("recipient:{}:{}", recipient_pk.x_decimal(), recipient_pk.y_decimal()),
        format!(
            "ciphertext_c1:{}:{}",
            ciphertext.c1.x_decimal(),
            ciphertext.c1.y_decimal()
        ),
        format!(
            "ciphertext_c2:{}:{}",
            ciphertext.c2.x_decimal(),
            ciphertext.c2.y_decimal()
        ),
        format!(
            "amount_proof_commitment:{}:{}",
            amount_proof.range_proof.commitment.x_decimal(),
            amount_proof.range_proof.commitment.y_decimal()
        ),
        format!(
            "amount_equality_proof:{}",
            amount_proof.equality_proof.c.to_decimal_string()
        ),
    ];

    if let Some(balance) = balance_proof {
        parts.push(format!(
            "balance_remaining_c1:{}:{}",
            balance.remaining_balance_ciphertext.c1.x_decimal(),
            balance.remaining_balance_ciphertext.c1.y_decimal()
        ));
        parts.push(format!(
            "balance_remaining_c2:{}:{}",
            balance.remaining_balance_ciphertext.c2.x_decimal(),
            balance.remaining_balance_ciphertext.c2.y_decimal()
        ));
        parts.push(format!(
            "balance_proof_commitment:{}:{}",
            balance.range_proof.commitment.x_decimal(),
            balance.range_proof.commitment.y_decimal()
        ));
        parts.push(format!(
            "balance_equality_proof:{}",
            balance.equality_proof.c.to_decimal_string()
        ));
        parts.push(format!(
            "balance_subtraction_hash:{}",
            balance.subtraction_proof.hash.to_decimal_string()
        ));
    }

    parts.join(":")
}

/// Reconstruct the sender's public key from a `"x:y"` ZK address.
pub fn parse_zk_address(ctx: &CryptoContext, address: &str) -> Result<Point> {
    let (x_str, y_str) = address
        .split_once(':')
        .ok_or_else(|| LedgerError::InvalidInput(format!("malformed ZK address: {address}")))?;
    let x = num_bigint::BigUint::parse_bytes(x_str.as_bytes(), 10)
        .ok_or_else(|| LedgerError::InvalidInput(format!("malformed ZK address: {address}")))?;
    let y = num_bigint::BigUint::parse_bytes(y_str.as_bytes(), 10)
        .ok_or_else(|| LedgerError::InvalidInput(format!("malformed ZK address: {address}")))?;
    let point = Point { curve: ctx.curve, x, y, is_identity: false };
    if !point.is_on_curve() {
        return Err(LedgerError::InvalidTransaction(format!(
            "address {address} is not on curve"
        )));
    }
    Ok(point)
}

pub fn zk_address(pk: &Point) -> String {
    format!("{}:{}", pk.x_decimal(), pk.y_decimal())
}

pub fn ring_address(view_pk: &Point, spend_pk: &Point) -> String {
    format!(
        "ring:{}:{}:{}:{}",
        view_pk.x_decimal(),
        view_pk.y_decimal(),
        spend_pk.x_decimal(),
        spend_pk.y_decimal()
    )
}

pub fn stealth_recipient_marker(p: &Point) -> String {
    format!("stealth:{}:{}", p.x_decimal(), p.y_decimal())
}

/// Verify a [`ZkTx`] end to end: ciphertext well-formedness, signature,
/// amount proof, and (if present) balance proof. Never learns the amount.
pub fn verify_zk_transaction(ctx: &CryptoContext, tx: &ZkTx) -> Result<()> {
    if !tx.ciphertext.is_well_formed() {
        return Err(LedgerError::InvalidTransaction(
            "ciphertext is off-curve or contains the identity element".into(),
        ));
    }

    let sender_pk = parse_zk_address(ctx, &tx.sender_address)?;
    let recipient_pk = parse_zk_address(ctx, &tx.recipient_address)?;

    let message = zk_signature_message(&recipient_pk, &tx.ciphertext, &tx.amount_proof, tx.balance_proof.as_ref());
    crate::proofs::schnorr::verify(&sender_pk, &tx.signature, &message)?;

    crate::proofs::equality::verify(
        ctx.curve,
        &ctx.h,
        &tx.ciphertext,
        &tx.amount_proof.range_proof.commitment,
        &recipient_pk,
        &tx.amount_proof.equality_proof,
    )?;
    crate::proofs::range::verify(ctx.curve, &ctx.h, &tx.amount_proof.range_proof)?;

    if let Some(balance) = &tx.balance_proof {
        crate::proofs::equality::verify(
            ctx.curve,
            &ctx.h,
            &balance.remaining_balance_ciphertext,
            &balance.range_proof.commitment,
            &sender_pk,
            &balance.equality_proof,
        )?;
        crate::proofs::range::verify(ctx.curve, &ctx.h, &balance.range_proof)?;
        crate::proofs::subtraction::verify(ctx.curve, &balance.subtraction_proof)?;
    }

    Ok(())
}

/// Construct the scalar signing key is held by the caller (wallet); this
/// builds everything else: ciphertext, amount proof, optional balance
/// proof, and the binding signature.
///
/// `balance_after` carries `(remaining_balance, original_balance_ciphertext,
/// original_balance_randomness)` — the wallet's own running balance
/// ciphertext under its *own* public key and the ElGamal randomness it was
/// encrypted with (SPEC_FULL.md §9: balance-ciphertext continuity is
/// wallet-private). The subtraction proof's public relation
/// `result == original - amount` only holds when all three ciphertexts
/// share a key, so the transfer amount is re-encrypted under `sender_pk`
/// here purely to derive the remaining-balance ciphertext homomorphically;
/// the recipient-facing `ciphertext` (under `recipient_pk`) is untouched.
/// Returns the new balance randomness alongside the transaction so the
/// wallet can track it for the next send.
#[allow(clippy::too_many_arguments)]
pub fn build_zk_transaction(
    ctx: &CryptoContext,
    sender_sk: &Scalar,
    sender_pk: &Point,
    recipient_pk: &Point,
    amount: u64,
    sender_address: String,
    recipient_address: String,
    balance_after: Option<(u64, &Ciphertext, &Scalar)>,
    timestamp: f64,
    rng: &mut impl rand::RngCore,
) -> Result<(ZkTx, Option<Scalar>)> {
    use crate::proofs::{equality, range, schnorr, subtraction};

    let (ciphertext, amount_randomness) =
        crate::elgamal::encrypt(ctx.curve, amount, recipient_pk, None, rng);

    let amount_blinding = Scalar::random(ctx.curve, rng);
    let amount_value = Scalar::new(ctx.curve, num_bigint::BigUint::from(amount));
    let amount_commitment = crate::commitment::commit(ctx.curve, &amount_value, &amount_blinding, &ctx.h);

    let amount_equality_proof = equality::create(
        ctx.curve,
        &ctx.h,
        &amount_value,
        &amount_randomness,
        &amount_blinding,
        &ciphertext,
        &amount_commitment,
        recipient_pk,
        rng,
    );
    let amount_range_proof = range::create(
        ctx.curve,
        &ctx.h,
        amount,
        0,
        crate::config::TX_MAX_AMOUNT,
        Some((amount_commitment, amount_blinding)),
        rng,
    )?;
    let amount_proof = AmountProof {
        range_proof: amount_range_proof,
        equality_proof: amount_equality_proof,
    };

    let mut new_balance_randomness = None;
    let balance_proof = match balance_after {
        None => None,
        Some((remaining_balance, original_balance_ciphertext, original_balance_randomness)) => {
            // Re-encrypt the amount under the sender's own key so the
            // subtraction relation is checked between ciphertexts that all
            // share `sender_pk`; `remaining_ciphertext`/`remaining_randomness`
            // are then derived homomorphically, not independently drawn, so
            // the public relation the proof asserts actually holds.
            let (amount_ciphertext_for_sender, amount_randomness_for_sender) =
                crate::elgamal::encrypt(ctx.curve, amount, sender_pk, None, rng);

            let remaining_ciphertext = original_balance_ciphertext.sub(&amount_ciphertext_for_sender);
            let remaining_randomness = original_balance_randomness.sub(&amount_randomness_for_sender);

            let remaining_blinding = Scalar::random(ctx.curve, rng);
            let remaining_value = Scalar::new(ctx.curve, num_bigint::BigUint::from(remaining_balance));
            let remaining_commitment =
                crate::commitment::commit(ctx.curve, &remaining_value, &remaining_blinding, &ctx.h);

            let remaining_equality_proof = equality::create(
                ctx.curve,
                &ctx.h,
                &remaining_value,
                &remaining_randomness,
                &remaining_blinding,
                &remaining_ciphertext,
                &remaining_commitment,
                sender_pk,
                rng,
            );
            let remaining_range_proof = range::create(
                ctx.curve,
                &ctx.h,
                remaining_balance,
                0,
                crate::config::TX_MAX_AMOUNT,
                Some((remaining_commitment, remaining_blinding)),
                rng,
            )?;
            let subtraction_proof = subtraction::create(
                ctx.curve,
                original_balance_ciphertext,
                &amount_ciphertext_for_sender,
                &remaining_ciphertext,
            )?;

            new_balance_randomness = Some(remaining_randomness);

            Some(BalanceProof {
                remaining_balance_ciphertext: remaining_ciphertext,
                range_proof: remaining_range_proof,
                equality_proof: remaining_equality_proof,
                subtraction_proof,
            })
        }
    };

    let message = zk_signature_message(recipient_pk, &ciphertext, &amount_proof, balance_proof.as_ref());
    let signature = schnorr::sign(ctx.curve, sender_sk, sender_pk, &message, rng);

    let tx_id = derive_tx_id(&sender_address, &recipient_address, timestamp);

    Ok((
        ZkTx {
            sender_address,
            recipient_address,
            ciphertext,
            amount_proof,
            balance_proof,
            signature,
            timestamp,
            tx_id,
        },
        new_balance_randomness,
    ))
}
