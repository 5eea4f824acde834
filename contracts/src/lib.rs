// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tally Settlement Contracts
//!
//! The state-transition functions of the receipt network. Three pieces,
//! one facade:
//!
//! - **Registry**: user indices bound to an address and a BLS key, with a
//!   proof-of-possession so that aggregate signatures cannot be forged
//!   with rogue keys.
//! - **Withdrawal Manager**: signed withdrawal intents that only pay out
//!   after a one-day challenge period.
//! - **Settlement Engine**: `post()`, which settles a whole batch of
//!   receipts against one aggregate signature, assigning sequence numbers,
//!   moving balances and slashing deposits of counterparties that cannot
//!   pay.
//!
//! [`ReceiptContract`] ties them to a storage backend, a clock and a
//! treasury, and runs every call through a journal.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. We use `checked_add`
//!    and explicit comparisons before every subtraction, because wrapping
//!    arithmetic and money do not mix.
//! 2. Cryptographic checks run last, over fully staged state. A failed
//!    check throws the whole call away.
//! 3. "Could not verify" and "did not verify" are the same answer: no.

pub mod contract;
pub mod error;
pub mod settlement;

mod registry;
mod withdrawal;

pub use contract::{CallOutcome, CommitInfo, Executed, ReceiptContract};
pub use error::ContractError;
pub use settlement::{SettledReceipt, SettlementSummary};
