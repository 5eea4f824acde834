// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Journal
//!
//! A write-ahead overlay over a [`Store`] for the lifetime of one call.
//!
//! Reads check staged writes first and fall through to the store. Writes
//! only ever land in the journal's [`ChangeSet`]. When the call succeeds,
//! the caller takes the change set with [`Journal::into_changes`] and hands
//! it to [`Store::apply`]. When it fails, the journal is dropped and the
//! store is exactly as it was.
//!
//! The journal borrows the store immutably, so nothing else can write to it
//! while a call is staged.

use super::{ChangeSet, Store, StoreResult};
use crate::types::{Account, PairKey, PendingWithdrawal, RegisteredUser, UserIndex};

/// Staged writes of an in-flight call.
pub struct Journal<'a, S: Store + ?Sized> {
    store: &'a S,
    changes: ChangeSet,
}

impl<'a, S: Store + ?Sized> Journal<'a, S> {
    /// Start an empty journal over `store`.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            changes: ChangeSet::default(),
        }
    }

    // -- Registry -----------------------------------------------------------

    pub fn user_count(&self) -> StoreResult<u64> {
        match self.changes.user_count {
            Some(count) => Ok(count),
            None => self.store.user_count(),
        }
    }

    pub fn set_user_count(&mut self, count: u64) {
        self.changes.user_count = Some(count);
    }

    pub fn user(&self, index: UserIndex) -> StoreResult<Option<RegisteredUser>> {
        match self.changes.users.get(&index) {
            Some(user) => Ok(Some(*user)),
            None => self.store.user(index),
        }
    }

    pub fn put_user(&mut self, index: UserIndex, user: RegisteredUser) {
        self.changes.users.insert(index, user);
    }

    // -- Ledger -------------------------------------------------------------

    pub fn account(&self, index: UserIndex) -> StoreResult<Account> {
        match self.changes.accounts.get(&index) {
            Some(account) => Ok(*account),
            None => self.store.account(index),
        }
    }

    pub fn put_account(&mut self, index: UserIndex, account: Account) {
        self.changes.accounts.insert(index, account);
    }

    pub fn security_deposit(&self, index: UserIndex) -> StoreResult<u128> {
        match self.changes.deposits.get(&index) {
            Some(deposit) => Ok(*deposit),
            None => self.store.security_deposit(index),
        }
    }

    pub fn put_security_deposit(&mut self, index: UserIndex, amount: u128) {
        self.changes.deposits.insert(index, amount);
    }

    // -- Receipts and withdrawals -------------------------------------------

    pub fn record(&self, pair: PairKey) -> StoreResult<u64> {
        match self.changes.records.get(&pair) {
            Some(seq_no) => Ok(*seq_no),
            None => self.store.record(pair),
        }
    }

    pub fn put_record(&mut self, pair: PairKey, seq_no: u64) {
        self.changes.records.insert(pair, seq_no);
    }

    pub fn withdrawal(&self, index: UserIndex) -> StoreResult<PendingWithdrawal> {
        match self.changes.withdrawals.get(&index) {
            Some(pending) => Ok(*pending),
            None => self.store.withdrawal(index),
        }
    }

    pub fn put_withdrawal(&mut self, index: UserIndex, pending: PendingWithdrawal) {
        self.changes.withdrawals.insert(index, pending);
    }

    // -- Completion ---------------------------------------------------------

    /// Staged writes so far, without consuming the journal.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Consume the journal and hand back its writes for commit.
    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}
