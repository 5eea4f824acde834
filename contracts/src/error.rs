// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Why a call was rejected.
//!
//! Every variant means the same thing to the ledger: nothing happened.

use tally_protocol::storage::StoreError;
use tally_protocol::wire::WireError;
use tally_protocol::UserIndex;
use thiserror::Error;

/// Errors returned by [`crate::ReceiptContract`] operations.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The registration proof did not verify under the submitted key, or
    /// the key or proof was not a valid curve point.
    #[error("invalid proof of possession")]
    InvalidProofOfPossession,

    /// The withdrawal intent was not signed by the user's registered key
    /// over their next nonce and the requested amount.
    #[error("invalid withdrawal signature")]
    InvalidWithdrawalSignature,

    /// The challenge period has not elapsed yet.
    #[error("withdrawal not ready: now {now}, valid after {valid_after}")]
    WithdrawalNotReady {
        /// Clock reading at the time of the call.
        now: u64,
        /// Earliest time the withdrawal can be finalized.
        valid_after: u64,
    },

    /// Finalize was called for a user with nothing pending.
    #[error("no pending withdrawal for user {0}")]
    NoPendingWithdrawal(UserIndex),

    /// The pending amount exceeds the balance left after settlement.
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Balance at the time of finalize.
        available: u128,
        /// Amount the withdrawal asks for.
        required: u128,
    },

    /// The batch's aggregate signature did not verify, or could not be
    /// checked at all.
    #[error("invalid aggregate signature")]
    InvalidAggregateSignature,

    /// The calldata did not decode.
    #[error("malformed calldata: {0}")]
    MalformedCalldata(#[from] WireError),

    /// An index with no registry entry was named by the call.
    #[error("user {0} is not registered")]
    UnregisteredUser(UserIndex),

    /// A receipt named the batch submitter as its own counterparty.
    #[error("user {0} cannot settle receipts against itself")]
    SelfSettlement(UserIndex),

    /// Crediting would overflow the account balance.
    #[error("balance overflow for user {0}")]
    BalanceOverflow(UserIndex),

    /// A counter (user count, nonce or sequence number) ran out of room.
    #[error("counter exhausted: {0}")]
    CounterExhausted(&'static str),

    /// The treasury refused the payout.
    #[error("treasury refused transfer of {amount} to {to}")]
    TransferFailed {
        /// Destination address, hex.
        to: String,
        /// Amount that was refused.
        amount: u128,
    },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ContractError {
    /// Stable short label, used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ContractError::InvalidProofOfPossession => "invalid_proof_of_possession",
            ContractError::InvalidWithdrawalSignature => "invalid_withdrawal_signature",
            ContractError::WithdrawalNotReady { .. } => "withdrawal_not_ready",
            ContractError::NoPendingWithdrawal(_) => "no_pending_withdrawal",
            ContractError::InsufficientBalance { .. } => "insufficient_balance",
            ContractError::InvalidAggregateSignature => "invalid_aggregate_signature",
            ContractError::MalformedCalldata(_) => "malformed_calldata",
            ContractError::UnregisteredUser(_) => "unregistered_user",
            ContractError::SelfSettlement(_) => "self_settlement",
            ContractError::BalanceOverflow(_) => "balance_overflow",
            ContractError::CounterExhausted(_) => "counter_exhausted",
            ContractError::TransferFailed { .. } => "transfer_failed",
            ContractError::Storage(_) => "storage",
        }
    }
}
