// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Withdrawal Manager
//!
//! Getting money out takes two calls and a day.
//!
//! ```text
//!           init_withdraw (signed)            process_withdrawal (anyone)
//!   NONE ──────────────────────────> PENDING ───────────────────────────> NONE
//!                                     │   ▲
//!                                     └───┘ init_withdraw again: overrides
//! ```
//!
//! The delay is the point. While a withdrawal is pending, counterparties
//! holding receipts against the user can still post them and drain the
//! balance the withdrawal was counting on. Finalize checks the balance at
//! the *end* of the period, not the start.
//!
//! The intent is signed over `(nonce + 1, amount)`. Finalize bumps the
//! nonce, so an old intent can never be resubmitted.

use tally_protocol::clock::Clock;
use tally_protocol::config::{BLS_DOMAIN, BUFFER_PERIOD_SECS};
use tally_protocol::crypto::{hash_to_point, verify_single, Signature};
use tally_protocol::storage::{Journal, Store};
use tally_protocol::treasury::Payout;
use tally_protocol::wire::{encode_withdrawal, SignatureWords};
use tally_protocol::{PendingWithdrawal, UserIndex};

use crate::error::ContractError;
use crate::registry;

/// Stage a withdrawal intent after checking its signature.
///
/// Replaces whatever was pending before, amount and timer both.
pub(crate) fn init_withdraw<S: Store + ?Sized, C: Clock + ?Sized>(
    journal: &mut Journal<'_, S>,
    clock: &C,
    index: UserIndex,
    amount: u128,
    signature: &SignatureWords,
) -> Result<PendingWithdrawal, ContractError> {
    let user = registry::lookup(journal, index)?;
    let account = journal.account(index)?;
    let next_nonce = account
        .nonce
        .checked_add(1)
        .ok_or(ContractError::CounterExhausted("account nonce"))?;

    let signature =
        Signature::from_words(signature).map_err(|_| ContractError::InvalidWithdrawalSignature)?;
    let message = hash_to_point(BLS_DOMAIN, &encode_withdrawal(next_nonce, amount))
        .map_err(|_| ContractError::InvalidWithdrawalSignature)?;
    if verify_single(&signature, &user.public_key, &message) != Ok(true) {
        return Err(ContractError::InvalidWithdrawalSignature);
    }

    let pending = PendingWithdrawal {
        amount,
        valid_after: clock.now().saturating_add(BUFFER_PERIOD_SECS),
    };
    journal.put_withdrawal(index, pending);

    tracing::debug!(
        index,
        amount,
        valid_after = pending.valid_after,
        "withdrawal intent staged"
    );
    Ok(pending)
}

/// Stage the finalization of a pending withdrawal and return the payout
/// the treasury must make at commit.
pub(crate) fn process_withdrawal<S: Store + ?Sized, C: Clock + ?Sized>(
    journal: &mut Journal<'_, S>,
    clock: &C,
    index: UserIndex,
) -> Result<Payout, ContractError> {
    let pending = journal.withdrawal(index)?;
    if !pending.is_pending() {
        return Err(ContractError::NoPendingWithdrawal(index));
    }

    let now = clock.now();
    if !pending.is_ready(now) {
        return Err(ContractError::WithdrawalNotReady {
            now,
            valid_after: pending.valid_after,
        });
    }

    let mut account = journal.account(index)?;
    if account.balance < pending.amount {
        return Err(ContractError::InsufficientBalance {
            available: account.balance,
            required: pending.amount,
        });
    }

    let user = registry::lookup(journal, index)?;
    account.balance -= pending.amount;
    account.nonce = account
        .nonce
        .checked_add(1)
        .ok_or(ContractError::CounterExhausted("account nonce"))?;
    journal.put_account(index, account);
    journal.put_withdrawal(index, PendingWithdrawal::NONE);

    Ok(Payout {
        to: user.address,
        amount: pending.amount,
    })
}
