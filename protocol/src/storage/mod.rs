// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Storage Module
//!
//! Everything the settlement contract remembers between calls, and the
//! machinery that makes each call all-or-nothing.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs     : Store trait, ChangeSet, StoreError
//! memory.rs  : MemoryStore, BTreeMaps, for tests and ephemeral nodes
//! db.rs      : LedgerDB, sled persistence with one atomic batch per call
//! journal.rs : Journal, the per-call write-ahead overlay
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! call ──> Journal (reads fall through to Store, writes stay staged)
//!             │
//!      Ok ────┴──── Err
//!      │             │
//!  ChangeSet       dropped, the store never saw a thing
//!      │
//!  Store::apply (one atomic batch)
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Reads default, never fail on absence.** An account nobody has
//!    touched is `Account::default()`, a pair that never settled has
//!    `seq_no == 0`. Only registry lookups return `Option`, because "not
//!    registered" is a real answer.
//!
//! 2. **Typed changes, not raw bytes.** The journal stages domain values.
//!    Each backend decides how to lay them out.
//!
//! 3. **Bincode for on-disk serialization.** Compact, fast, deterministic.
//!    JSON is for APIs and debugging; bincode is for storage.

pub mod db;
pub mod journal;
pub mod memory;

pub use db::LedgerDB;
pub use journal::Journal;
pub use memory::MemoryStore;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::crypto::blake3_hash;
use crate::types::{Account, PairKey, PendingWithdrawal, RegisteredUser, UserIndex};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Backing storage for the ledger and the settlement contract.
///
/// Implementations must make [`apply`](Store::apply) atomic: after it
/// returns, either every entry of the change set is visible or none is.
pub trait Store {
    /// Number of registered users. Also the highest allocated index.
    fn user_count(&self) -> StoreResult<u64>;

    /// The registry entry for `index`, if that user exists.
    fn user(&self, index: UserIndex) -> StoreResult<Option<RegisteredUser>>;

    /// Balance and nonce for `index`. Untouched accounts are zero.
    fn account(&self, index: UserIndex) -> StoreResult<Account>;

    /// Posted security deposit for `index`.
    fn security_deposit(&self, index: UserIndex) -> StoreResult<u128>;

    /// Last settled sequence number for a directed pair.
    fn record(&self, pair: PairKey) -> StoreResult<u64>;

    /// Pending withdrawal for `index`, or [`PendingWithdrawal::NONE`].
    fn withdrawal(&self, index: UserIndex) -> StoreResult<PendingWithdrawal>;

    /// Atomically apply a set of staged writes.
    fn apply(&mut self, changes: ChangeSet) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// The writes produced by one successful call.
///
/// Maps are ordered so that iterating a change set (and hashing it) is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub user_count: Option<u64>,
    pub users: BTreeMap<UserIndex, RegisteredUser>,
    pub accounts: BTreeMap<UserIndex, Account>,
    pub deposits: BTreeMap<UserIndex, u128>,
    pub records: BTreeMap<PairKey, u64>,
    pub withdrawals: BTreeMap<UserIndex, PendingWithdrawal>,
}

impl ChangeSet {
    /// Returns `true` if nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.user_count.is_none()
            && self.users.is_empty()
            && self.accounts.is_empty()
            && self.deposits.is_empty()
            && self.records.is_empty()
            && self.withdrawals.is_empty()
    }

    /// Number of individual entries this change set writes.
    pub fn len(&self) -> usize {
        usize::from(self.user_count.is_some())
            + self.users.len()
            + self.accounts.len()
            + self.deposits.len()
            + self.records.len()
            + self.withdrawals.len()
    }

    /// BLAKE3 digest of the bincode encoding. Two calls that wrote the same
    /// values produce the same digest.
    pub fn digest(&self) -> StoreResult<[u8; 32]> {
        let bytes = bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(blake3_hash(&bytes))
    }
}
