// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Wire Formats
//!
//! How bytes become typed values and back again. Two families live here:
//!
//! - **Signed messages** ([`message`]): the exact byte strings users hash to
//!   the curve and sign. Registration, withdrawal, receipt, and the batch
//!   commitment.
//! - **Calldata** ([`call`], [`batch`]): what a caller submits. A four-byte
//!   selector, then either 32-byte ABI words or, for `post()`, a compact
//!   packed layout.
//!
//! Every decoder here is bounds-checked and length-exact. Trailing bytes
//! are an error, not a curiosity. Curve points stay as raw words at this
//! layer: whether they are valid is a question for the contract, which
//! turns a bad point into a failed signature check rather than a parse
//! error.

pub mod batch;
pub mod call;
pub mod message;

pub use batch::{ReceiptBatch, WireReceipt};
pub use call::Call;
pub use message::{encode_receipt, encode_registration, encode_withdrawal, Commitment};

use thiserror::Error;

use crate::config::{PUBLIC_KEY_WORDS, SIGNATURE_WORDS, WORD_LENGTH};
use crate::crypto::Word;
use crate::types::Address;

/// A public key as it travels: four words, `x.c1, x.c0, y.c1, y.c0`.
pub type PublicKeyWords = [Word; PUBLIC_KEY_WORDS];

/// A signature as it travels: two words, `x, y`.
pub type SignatureWords = [Word; SIGNATURE_WORDS];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Calldata that could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("calldata truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("calldata length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("unknown selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    #[error("malformed word at offset {offset}: {reason}")]
    BadWord { offset: usize, reason: &'static str },

    #[error("batch of {0} receipts exceeds the 16-bit count field")]
    TooManyReceipts(usize),
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

/// Left-pad big-endian bytes into a word.
fn pad_word(bytes: &[u8]) -> Word {
    let mut word = [0u8; WORD_LENGTH];
    word[WORD_LENGTH - bytes.len()..].copy_from_slice(bytes);
    word
}

pub fn word_from_u64(value: u64) -> Word {
    pad_word(&value.to_be_bytes())
}

pub fn word_from_u128(value: u128) -> Word {
    pad_word(&value.to_be_bytes())
}

pub fn word_from_address(address: &Address) -> Word {
    pad_word(address.as_bytes())
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Forward-only cursor over calldata. Every read is bounds-checked.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// `offset` is where `bytes` starts within the full calldata; it only
    /// matters for error messages.
    pub(crate) fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.bytes.len() < n {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed: n,
                available: self.bytes.len(),
            });
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        self.offset += n;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub(crate) fn u128(&mut self) -> Result<u128, WireError> {
        Ok(u128::from_be_bytes(self.take_array()?))
    }

    pub(crate) fn word(&mut self) -> Result<Word, WireError> {
        self.take_array()
    }

    pub(crate) fn words<const N: usize>(&mut self) -> Result<[Word; N], WireError> {
        let mut out = [[0u8; WORD_LENGTH]; N];
        for word in out.iter_mut() {
            *word = self.word()?;
        }
        Ok(out)
    }

    /// A word holding a value of `width` bytes; the padding must be zero.
    fn narrow_word(&mut self, width: usize, reason: &'static str) -> Result<&'a [u8], WireError> {
        let offset = self.offset;
        let word = self.take(WORD_LENGTH)?;
        let (pad, value) = word.split_at(WORD_LENGTH - width);
        if pad.iter().any(|b| *b != 0) {
            return Err(WireError::BadWord { offset, reason });
        }
        Ok(value)
    }

    pub(crate) fn u64_word(&mut self) -> Result<u64, WireError> {
        let bytes = self.narrow_word(8, "value exceeds 64 bits")?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(arr))
    }

    pub(crate) fn u128_word(&mut self) -> Result<u128, WireError> {
        let bytes = self.narrow_word(16, "value exceeds 128 bits")?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(u128::from_be_bytes(arr))
    }

    pub(crate) fn address_word(&mut self) -> Result<Address, WireError> {
        let offset = self.offset;
        let bytes = self.narrow_word(20, "address has non-zero padding")?;
        Address::from_slice(bytes).map_err(|_| WireError::BadWord {
            offset,
            reason: "bad address",
        })
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len()
    }
}
