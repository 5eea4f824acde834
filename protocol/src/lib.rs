// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tally Protocol: Core Library
//!
//! Tally is a bilateral receipt network. Counterparties trade signed
//! receipts off-chain and, every so often, one of them settles a whole
//! batch of receipts in a single call whose authenticity is proven by one
//! aggregated BLS signature. N receipts, one pairing check.
//!
//! This crate holds everything the settlement contracts stand on. It does
//! not decide *what* a call does to the ledger; that lives in
//! `tally-contracts`. It decides how bytes become typed values, how keys
//! and signatures behave, and how a call's writes are staged and committed.
//!
//! ## Architecture
//!
//! - **crypto**: BLS signatures over BN254 (keys on G2, signatures on G1),
//!   hash-to-curve with a domain tag, SHA-256/BLAKE3 helpers.
//! - **types**: Addresses, user indices, accounts, pending withdrawals.
//! - **wire**: Signed-message encodings and the bounds-checked calldata
//!   codec (including the compact `post()` batch layout).
//! - **storage**: The `Store` trait, in-memory and sled backends, and the
//!   write-ahead `Journal` that makes every call all-or-nothing.
//! - **clock**: The time collaborator (`now`, settlement cycle expiry).
//! - **treasury**: The token-transfer collaborator used by withdrawals.
//! - **config**: Protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. Decode and validate before touching state. Malformed bytes never
//!    reach the ledger.
//! 2. Stage, check, then commit. A failed call leaves no trace.
//! 3. No unsafe code in crypto paths.
//! 4. If it touches money, it has tests. Plural.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod storage;
pub mod treasury;
pub mod types;
pub mod wire;

pub use types::{Account, Address, PairKey, PendingWithdrawal, RegisteredUser, UserIndex};
