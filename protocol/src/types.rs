// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Data Model
//!
//! The handful of types every layer agrees on: who a user is (an index and
//! an address), what they own (an [`Account`]), and what they are about to
//! take out (a [`PendingWithdrawal`]).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;
use crate::crypto::PublicKey;

/// Dense, 1-based user identifier assigned at registration. `0` is never a
/// valid user.
pub type UserIndex = u64;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Errors from parsing an [`Address`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address hex: {0}")]
    InvalidHex(String),

    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 20-byte account address. Withdrawals pay out to it, and registration
/// binds it to a BLS key by signing it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Registry Entry
// ---------------------------------------------------------------------------

/// The write-once binding created by a successful registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    /// Where withdrawals are paid.
    pub address: Address,
    /// Key that signs this user's receipts, withdrawals and batch commitments.
    pub public_key: PublicKey,
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Per-user ledger entry owned by the base ledger.
///
/// Settlement touches `balance` only. Withdrawals touch both: the nonce is
/// what makes a withdrawal signature single-use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Spendable balance in the smallest token unit.
    pub balance: u128,
    /// Number of finalized withdrawals.
    pub nonce: u64,
}

impl Account {
    /// Create an account with the given balance and a zero nonce.
    pub fn with_balance(balance: u128) -> Self {
        Self { balance, nonce: 0 }
    }
}

// ---------------------------------------------------------------------------
// Pending Withdrawal
// ---------------------------------------------------------------------------

/// An announced withdrawal waiting out its challenge period.
///
/// `valid_after == 0` is the sentinel for "nothing pending". Real entries
/// always carry `now + BUFFER_PERIOD_SECS`, which is never zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    /// Amount to pay out on finalize.
    pub amount: u128,
    /// Earliest timestamp (seconds) at which finalize succeeds.
    pub valid_after: u64,
}

impl PendingWithdrawal {
    /// The "nothing pending" sentinel.
    pub const NONE: PendingWithdrawal = PendingWithdrawal {
        amount: 0,
        valid_after: 0,
    };

    /// Returns `true` if a withdrawal has been announced and not yet finalized.
    pub fn is_pending(&self) -> bool {
        self.valid_after != 0
    }

    /// Returns `true` if the challenge period has elapsed at `now`.
    pub fn is_ready(&self, now: u64) -> bool {
        self.is_pending() && now >= self.valid_after
    }
}

// ---------------------------------------------------------------------------
// Record key
// ---------------------------------------------------------------------------

/// Directed pair `(payer, payee)` keying a receipt sequence counter.
///
/// The payer is the batch submitter `a`, the payee is the receipt signer
/// `b`. `(1, 2)` and `(2, 1)` are independent counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub payer: UserIndex,
    pub payee: UserIndex,
}

impl PairKey {
    pub fn new(payer: UserIndex, payee: UserIndex) -> Self {
        Self { payer, payee }
    }

    /// 16-byte big-endian key, payer first.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.payer.to_be_bytes());
        out[8..].copy_from_slice(&self.payee.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_hex_roundtrip() {
        let addr = Address::new([0xAB; 20]);
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(parsed, addr);
        assert!(addr.to_string().starts_with("0x"));
    }

    #[test]
    fn address_without_prefix_parses() {
        let addr: Address = "0101010101010101010101010101010101010101".parse().unwrap();
        assert_eq!(addr.as_bytes(), &[1u8; 20]);
    }

    #[test]
    fn address_wrong_length_rejected() {
        let result: Result<Address, _> = "0xdeadbeef".parse();
        assert_eq!(result, Err(AddressError::InvalidLength(4)));
    }

    #[test]
    fn address_bad_hex_rejected() {
        let result: Result<Address, _> = "0xzz".parse();
        assert!(matches!(result, Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let addr = Address::new([0x11; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn pending_withdrawal_sentinel() {
        assert!(!PendingWithdrawal::NONE.is_pending());
        assert!(!PendingWithdrawal::NONE.is_ready(u64::MAX));
        assert_eq!(PendingWithdrawal::default(), PendingWithdrawal::NONE);
    }

    #[test]
    fn pending_withdrawal_ready_boundary_inclusive() {
        let w = PendingWithdrawal {
            amount: 10,
            valid_after: 1_000,
        };
        assert!(!w.is_ready(999));
        assert!(w.is_ready(1_000));
    }

    #[test]
    fn pair_key_is_directed() {
        assert_ne!(PairKey::new(1, 2), PairKey::new(2, 1));
        assert_ne!(PairKey::new(1, 2).to_bytes(), PairKey::new(2, 1).to_bytes());
    }
}
