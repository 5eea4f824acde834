// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LedgerDB: Persistent Storage Engine
//!
//! The persistence layer for Tally, built on sled's embedded key-value
//! store. All on-disk data flows through this module.
//!
//! ## Key Layout
//!
//! Everything lives in a single sled tree, `ledger`. sled only guarantees
//! atomic batches *within* one tree, and a settlement call touches
//! accounts, deposits and records at once, so splitting them across trees
//! would make commit non-atomic. Instead each entry kind gets a one-byte
//! prefix:
//!
//! | Prefix | Key                         | Value                        |
//! |--------|-----------------------------|------------------------------|
//! | `0x00` | `"user_count"`              | `u64` (8B BE)                |
//! | `0x01` | `index` (8B BE)             | `bincode(RegisteredUser)`    |
//! | `0x02` | `index` (8B BE)             | `bincode(Account)`           |
//! | `0x03` | `index` (8B BE)             | `u128` (16B BE)              |
//! | `0x04` | `payer ‖ payee` (16B BE)    | `u64` (8B BE)                |
//! | `0x05` | `index` (8B BE)             | `bincode(PendingWithdrawal)` |
//!
//! Indices are big-endian so that sled's lexicographic ordering matches
//! numeric ordering and range scans over users work naturally.
//!
//! ## Atomicity
//!
//! [`Store::apply`] turns a [`ChangeSet`] into one `sled::Batch` and
//! applies it in a single call, then flushes. Either every write of a call
//! lands on disk or none does.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use std::path::Path;

use super::{ChangeSet, Store, StoreError, StoreResult};
use crate::types::{Account, PairKey, PendingWithdrawal, RegisteredUser, UserIndex};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

const TREE_NAME: &str = "ledger";

const PREFIX_META: u8 = 0x00;
const PREFIX_USER: u8 = 0x01;
const PREFIX_ACCOUNT: u8 = 0x02;
const PREFIX_DEPOSIT: u8 = 0x03;
const PREFIX_RECORD: u8 = 0x04;
const PREFIX_WITHDRAWAL: u8 = 0x05;

const META_USER_COUNT: &[u8] = b"user_count";

fn meta_key(name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(PREFIX_META);
    key.extend_from_slice(name);
    key
}

fn index_key(prefix: u8, index: UserIndex) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = prefix;
    key[1..].copy_from_slice(&index.to_be_bytes());
    key
}

fn record_key(pair: PairKey) -> [u8; 17] {
    let mut key = [0u8; 17];
    key[0] = PREFIX_RECORD;
    key[1..].copy_from_slice(&pair.to_bytes());
    key
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_u64(bytes: &[u8]) -> StoreResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Serialization("invalid u64 bytes".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

fn decode_u128(bytes: &[u8]) -> StoreResult<u128> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| StoreError::Serialization("invalid u128 bytes".to_string()))?;
    Ok(u128::from_be_bytes(arr))
}

// ---------------------------------------------------------------------------
// LedgerDB
// ---------------------------------------------------------------------------

/// Persistent [`Store`] on sled.
///
/// # Thread Safety
///
/// sled handles are cheap to clone and safe to share. Writes still go
/// through `&mut self` via [`Store::apply`], so the single-writer rule is
/// enforced by whoever owns the contract, not by this type.
#[derive(Debug, Clone)]
pub struct LedgerDB {
    db: Db,
    ledger: Tree,
}

impl LedgerDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    ///
    /// Ideal for unit tests: no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let ledger = db.open_tree(TREE_NAME)?;
        Ok(Self { db, ledger })
    }

    /// All registered users in index order.
    pub fn users(&self) -> StoreResult<Vec<(UserIndex, RegisteredUser)>> {
        let mut users = Vec::new();
        for entry in self.ledger.scan_prefix([PREFIX_USER]) {
            let (key, value) = entry?;
            let index = decode_u64(&key[1..])?;
            users.push((index, decode(&value)?));
        }
        Ok(users)
    }

    /// Approximate on-disk size in bytes.
    pub fn size_on_disk(&self) -> StoreResult<u64> {
        Ok(self.db.size_on_disk()?)
    }

    /// Force all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn get_raw(&self, key: &[u8]) -> StoreResult<Option<sled::IVec>> {
        Ok(self.ledger.get(key)?)
    }
}

impl Store for LedgerDB {
    fn user_count(&self) -> StoreResult<u64> {
        match self.get_raw(&meta_key(META_USER_COUNT))? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    fn user(&self, index: UserIndex) -> StoreResult<Option<RegisteredUser>> {
        match self.get_raw(&index_key(PREFIX_USER, index))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn account(&self, index: UserIndex) -> StoreResult<Account> {
        match self.get_raw(&index_key(PREFIX_ACCOUNT, index))? {
            Some(bytes) => decode(&bytes),
            None => Ok(Account::default()),
        }
    }

    fn security_deposit(&self, index: UserIndex) -> StoreResult<u128> {
        match self.get_raw(&index_key(PREFIX_DEPOSIT, index))? {
            Some(bytes) => decode_u128(&bytes),
            None => Ok(0),
        }
    }

    fn record(&self, pair: PairKey) -> StoreResult<u64> {
        match self.get_raw(&record_key(pair))? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    fn withdrawal(&self, index: UserIndex) -> StoreResult<PendingWithdrawal> {
        match self.get_raw(&index_key(PREFIX_WITHDRAWAL, index))? {
            Some(bytes) => decode(&bytes),
            None => Ok(PendingWithdrawal::NONE),
        }
    }

    fn apply(&mut self, changes: ChangeSet) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // Encode everything first so a serialization failure cannot leave
        // half a batch behind.
        let mut batch = Batch::default();
        if let Some(count) = changes.user_count {
            batch.insert(meta_key(META_USER_COUNT), &count.to_be_bytes());
        }
        for (index, user) in &changes.users {
            batch.insert(&index_key(PREFIX_USER, *index), encode(user)?);
        }
        for (index, account) in &changes.accounts {
            batch.insert(&index_key(PREFIX_ACCOUNT, *index), encode(account)?);
        }
        for (index, deposit) in &changes.deposits {
            batch.insert(&index_key(PREFIX_DEPOSIT, *index), &deposit.to_be_bytes());
        }
        for (pair, seq_no) in &changes.records {
            batch.insert(&record_key(*pair), &seq_no.to_be_bytes());
        }
        for (index, pending) in &changes.withdrawals {
            batch.insert(&index_key(PREFIX_WITHDRAWAL, *index), encode(pending)?);
        }

        self.ledger.apply_batch(batch)?;
        self.db.flush()?;

        tracing::trace!(entries = changes.len(), "ledger batch applied");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
