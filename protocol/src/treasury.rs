// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Treasury
//!
//! The token-transfer primitive a withdrawal pays out through. The ledger
//! only tracks *claims*; moving actual tokens to an address is someone
//! else's job, and that someone may say no.
//!
//! [`PayoutLog`] is the reference implementation: it records every payout
//! and optionally draws from a finite reserve so tests can make it refuse.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Address;

/// Pays tokens out to an address.
pub trait Treasury {
    /// Transfer `amount` to `to`. Returns `false` if the transfer was
    /// refused, in which case nothing moved.
    fn transfer(&mut self, to: &Address, amount: u128) -> bool;
}

/// One completed payout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: Address,
    pub amount: u128,
}

#[derive(Debug, Default)]
struct PayoutState {
    reserve: Option<u128>,
    payouts: Vec<Payout>,
}

/// A [`Treasury`] that records payouts in memory.
///
/// Clones share state, so the node (or a test) can inspect payouts while
/// the contract owns another handle.
#[derive(Clone, Debug, Default)]
pub struct PayoutLog {
    state: Arc<Mutex<PayoutState>>,
}

impl PayoutLog {
    /// A treasury that never runs dry.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A treasury holding exactly `reserve` tokens.
    pub fn with_reserve(reserve: u128) -> Self {
        Self {
            state: Arc::new(Mutex::new(PayoutState {
                reserve: Some(reserve),
                payouts: Vec::new(),
            })),
        }
    }

    /// Remaining reserve, or `None` if unlimited.
    pub fn reserve(&self) -> Option<u128> {
        self.state.lock().reserve
    }

    /// Every payout made so far, oldest first.
    pub fn payouts(&self) -> Vec<Payout> {
        self.state.lock().payouts.clone()
    }

    /// Sum of all payouts.
    pub fn total_paid(&self) -> u128 {
        self.state
            .lock()
            .payouts
            .iter()
            .fold(0u128, |acc, p| acc.saturating_add(p.amount))
    }
}

impl Treasury for PayoutLog {
    fn transfer(&mut self, to: &Address, amount: u128) -> bool {
        let mut state = self.state.lock();
        if let Some(reserve) = state.reserve {
            match reserve.checked_sub(amount) {
                Some(left) => state.reserve = Some(left),
                None => return false,
            }
        }
        state.payouts.push(Payout { to: *to, amount });
        true
    }
}
