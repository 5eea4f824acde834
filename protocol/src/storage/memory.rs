// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! In-memory [`Store`]. Nothing survives a restart.

use std::collections::BTreeMap;

use super::{ChangeSet, Store, StoreResult};
use crate::types::{Account, PairKey, PendingWithdrawal, RegisteredUser, UserIndex};

/// A [`Store`] backed by ordered maps.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    user_count: u64,
    users: BTreeMap<UserIndex, RegisteredUser>,
    accounts: BTreeMap<UserIndex, Account>,
    deposits: BTreeMap<UserIndex, u128>,
    records: BTreeMap<PairKey, u64>,
    withdrawals: BTreeMap<UserIndex, PendingWithdrawal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn user_count(&self) -> StoreResult<u64> {
        Ok(self.user_count)
    }

    fn user(&self, index: UserIndex) -> StoreResult<Option<RegisteredUser>> {
        Ok(self.users.get(&index).copied())
    }

    fn account(&self, index: UserIndex) -> StoreResult<Account> {
        Ok(self.accounts.get(&index).copied().unwrap_or_default())
    }

    fn security_deposit(&self, index: UserIndex) -> StoreResult<u128> {
        Ok(self.deposits.get(&index).copied().unwrap_or(0))
    }

    fn record(&self, pair: PairKey) -> StoreResult<u64> {
        Ok(self.records.get(&pair).copied().unwrap_or(0))
    }

    fn withdrawal(&self, index: UserIndex) -> StoreResult<PendingWithdrawal> {
        Ok(self.withdrawals.get(&index).copied().unwrap_or_default())
    }

    fn apply(&mut self, changes: ChangeSet) -> StoreResult<()> {
        if let Some(count) = changes.user_count {
            self.user_count = count;
        }
        self.users.extend(changes.users);
        self.accounts.extend(changes.accounts);
        self.deposits.extend(changes.deposits);
        self.records.extend(changes.records);
        self.withdrawals.extend(changes.withdrawals);
        Ok(())
    }
}
