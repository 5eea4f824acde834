// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! The compact `post()` layout.
//!
//! ```text
//! offset       size  field
//! 0            4     selector
//! 4            8     a_index
//! 12           2     count
//! 14           64    aggregate signature (x ‖ y)
//! 78 + 24·i    8     receipt[i].b_index
//! 86 + 24·i    16    receipt[i].amount
//! ```
//!
//! Total length is exactly `78 + 24·count`. `expires_by` and `seq_no` are
//! not on the wire at all; the contract reconstructs them, which is what
//! keeps a receipt at 24 bytes.

use super::{Reader, WireError};
use crate::config::{
    BATCH_HEADER_LENGTH, BATCH_RECEIPTS_OFFSET, MAX_BATCH_RECEIPTS, RECEIPT_WIRE_LENGTH,
    SELECTOR_LENGTH, SIGNATURE_LENGTH,
};
use crate::types::UserIndex;

/// One receipt as submitted: who owes, and how much.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireReceipt {
    pub b_index: UserIndex,
    pub amount: u128,
}

/// A decoded `post()` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptBatch {
    /// The submitter, who collects every receipt.
    pub a_index: UserIndex,
    /// Aggregate of every receipt signature plus `a`'s commitment signature.
    pub signature: [u8; SIGNATURE_LENGTH],
    pub receipts: Vec<WireReceipt>,
}

impl ReceiptBatch {
    /// Exact calldata length (selector included) for `count` receipts.
    pub fn wire_length(count: usize) -> usize {
        BATCH_RECEIPTS_OFFSET + count * RECEIPT_WIRE_LENGTH
    }

    /// Decode everything after the selector.
    pub fn decode_body(body: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(body, SELECTOR_LENGTH);
        let a_index = reader.u64()?;
        let count = usize::from(reader.u16()?);
        let mut signature = [0u8; SIGNATURE_LENGTH];
        signature.copy_from_slice(reader.take(SIGNATURE_LENGTH)?);

        let expected = BATCH_HEADER_LENGTH + count * RECEIPT_WIRE_LENGTH;
        if body.len() != expected {
            return Err(WireError::LengthMismatch {
                expected: SELECTOR_LENGTH + expected,
                got: SELECTOR_LENGTH + body.len(),
            });
        }

        let mut receipts = Vec::with_capacity(count);
        for _ in 0..count {
            let b_index = reader.u64()?;
            let amount = reader.u128()?;
            receipts.push(WireReceipt { b_index, amount });
        }
        debug_assert_eq!(reader.remaining(), 0);

        Ok(Self {
            a_index,
            signature,
            receipts,
        })
    }

    /// Encode everything after the selector.
    pub fn encode_body(&self) -> Result<Vec<u8>, WireError> {
        if self.receipts.len() > MAX_BATCH_RECEIPTS {
            return Err(WireError::TooManyReceipts(self.receipts.len()));
        }
        // Checked just above.
        let count = self.receipts.len() as u16;

        let mut out = Vec::with_capacity(Self::wire_length(self.receipts.len()) - SELECTOR_LENGTH);
        out.extend_from_slice(&self.a_index.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&self.signature);
        for receipt in &self.receipts {
            out.extend_from_slice(&receipt.b_index.to_be_bytes());
            out.extend_from_slice(&receipt.amount.to_be_bytes());
        }
        Ok(out)
    }

    /// Sum of requested amounts, saturating.
    pub fn total_requested(&self) -> u128 {
        self.receipts
            .iter()
            .fold(0u128, |acc, r| acc.saturating_add(r.amount))
    }
}
