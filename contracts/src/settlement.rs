// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Settlement Engine
//!
//! Turns a compact batch of receipts into balance movements, proven by one
//! aggregate signature.
//!
//! ## What gets signed, by whom
//!
//! ```text
//! receipt i    signed by b_i   word(a) ‖ word(b_i) ‖ word(amount_i) ‖ word(expires_by) ‖ word(seq_no_i)
//! commitment   signed by a     b_0 ‖ amount_0 ‖ seq_no_0 ‖ b_1 ‖ … (packed, 32 bytes each)
//! ```
//!
//! Neither `expires_by` nor `seq_no` is on the wire. The contract fills in
//! the current cycle expiry and the next sequence number for each pair, and
//! if those are not what the signers signed, the aggregate fails. That is
//! the whole replay defence: a batch verifies at exactly one point in each
//! pair's sequence.
//!
//! ## Trust asymmetry
//!
//! Each `b` signs every receipt individually: `a` can only collect what
//! `b` agreed to. `a` signs only the commitment: since `a` is the one being
//! credited, all it needs to prove is that it submitted this batch.
//!
//! ## Short balances
//!
//! A receipt larger than `b`'s balance is not rejected. `a` gets whatever
//! is left, `b`'s balance goes to zero, and `b`'s security deposit is
//! slashed to zero as well. Settlement never fails because a counterparty
//! overspent.
//!
//! ## Ordering
//!
//! Every mutation is staged first and the single pairing check runs last.
//! If it fails, the journal is dropped and the batch never happened.

use serde::{Deserialize, Serialize};
use tally_protocol::config::BLS_DOMAIN;
use tally_protocol::crypto::{hash_to_point, verify_multiple, MessagePoint, PublicKey, Signature};
use tally_protocol::storage::{Journal, Store};
use tally_protocol::wire::{encode_receipt, Commitment, ReceiptBatch};
use tally_protocol::{PairKey, UserIndex};

use crate::error::ContractError;
use crate::registry;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened to one receipt of a settled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledReceipt {
    /// The counterparty that signed the receipt.
    pub b_index: UserIndex,
    /// Amount on the receipt.
    pub requested: u128,
    /// Amount actually moved to `a`. Less than `requested` only when slashed.
    pub transferred: u128,
    /// Sequence number assigned to this receipt.
    pub seq_no: u64,
    /// `true` if `b` could not cover the receipt and lost its deposit.
    pub slashed: bool,
}

/// Outcome of a successful `post()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub a_index: UserIndex,
    /// Cycle expiry every receipt in the batch was bound to.
    pub expires_by: u32,
    pub receipts: Vec<SettledReceipt>,
    /// Sum of `transferred` over all receipts.
    pub total_credited: u128,
}

impl SettlementSummary {
    /// Number of receipts that triggered a slash.
    pub fn slashed_count(&self) -> usize {
        self.receipts.iter().filter(|r| r.slashed).count()
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Stage the effects of `batch` and verify its aggregate signature.
///
/// Returns the summary only if the signature verifies; on any error the
/// caller must discard the journal.
pub(crate) fn settle<S: Store + ?Sized>(
    journal: &mut Journal<'_, S>,
    expires_by: u32,
    batch: &ReceiptBatch,
) -> Result<SettlementSummary, ContractError> {
    let a = batch.a_index;
    let a_user = registry::lookup(journal, a)?;
    let mut a_account = journal.account(a)?;

    let count = batch.receipts.len();
    let mut keys: Vec<PublicKey> = Vec::with_capacity(count + 1);
    let mut messages: Vec<MessagePoint> = Vec::with_capacity(count + 1);
    let mut commitment = Commitment::with_capacity(count);
    let mut settled = Vec::with_capacity(count);
    let mut total_credited: u128 = 0;

    for receipt in &batch.receipts {
        let b = receipt.b_index;
        if b == a {
            return Err(ContractError::SelfSettlement(a));
        }
        let b_user = registry::lookup(journal, b)?;

        let pair = PairKey::new(a, b);
        let seq_no = journal
            .record(pair)?
            .checked_add(1)
            .ok_or(ContractError::CounterExhausted("receipt sequence"))?;
        journal.put_record(pair, seq_no);

        let message = encode_receipt(a, b, receipt.amount, expires_by, seq_no);
        messages.push(
            hash_to_point(BLS_DOMAIN, &message)
                .map_err(|_| ContractError::InvalidAggregateSignature)?,
        );
        keys.push(b_user.public_key);
        commitment.push(b, receipt.amount, seq_no);

        let mut b_account = journal.account(b)?;
        let (transferred, slashed) = if b_account.balance < receipt.amount {
            let available = b_account.balance;
            b_account.balance = 0;
            journal.put_security_deposit(b, 0);
            (available, true)
        } else {
            b_account.balance -= receipt.amount;
            (receipt.amount, false)
        };
        journal.put_account(b, b_account);

        a_account.balance = a_account
            .balance
            .checked_add(transferred)
            .ok_or(ContractError::BalanceOverflow(a))?;
        total_credited = total_credited.saturating_add(transferred);

        tracing::debug!(
            a,
            b,
            seq_no,
            requested = receipt.amount,
            transferred,
            slashed,
            "receipt staged"
        );

        settled.push(SettledReceipt {
            b_index: b,
            requested: receipt.amount,
            transferred,
            seq_no,
            slashed,
        });
    }

    messages.push(
        hash_to_point(BLS_DOMAIN, commitment.as_bytes())
            .map_err(|_| ContractError::InvalidAggregateSignature)?,
    );
    keys.push(a_user.public_key);
    journal.put_account(a, a_account);

    let signature = Signature::from_bytes(&batch.signature)
        .map_err(|_| ContractError::InvalidAggregateSignature)?;
    if verify_multiple(&signature, &keys, &messages) != Ok(true) {
        return Err(ContractError::InvalidAggregateSignature);
    }

    Ok(SettlementSummary {
        a_index: a,
        expires_by,
        receipts: settled,
        total_credited,
    })
}
