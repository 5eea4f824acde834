// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Signed-message encodings.
//!
//! These are the byte strings that get hashed to G1 and signed. They must
//! match what client wallets produce bit for bit, so they are deliberately
//! dumb: fixed-width big-endian words, no length prefixes, no versioning
//! beyond the domain tag.

use super::{word_from_address, word_from_u128, word_from_u64};
use crate::config::{COMMITMENT_ENTRY_LENGTH, WORD_LENGTH};
use crate::types::{Address, UserIndex};

/// Registration proof-of-possession message: `word(address)`.
pub fn encode_registration(address: &Address) -> [u8; WORD_LENGTH] {
    word_from_address(address)
}

/// Withdrawal intent: `word(nonce) ‖ word(amount)`.
///
/// `nonce` is the account nonce the withdrawal will *become*, i.e. the
/// current nonce plus one. A finalized withdrawal bumps the account nonce,
/// so its signature can never be replayed.
pub fn encode_withdrawal(nonce: u64, amount: u128) -> [u8; 2 * WORD_LENGTH] {
    let mut out = [0u8; 2 * WORD_LENGTH];
    out[..WORD_LENGTH].copy_from_slice(&word_from_u64(nonce));
    out[WORD_LENGTH..].copy_from_slice(&word_from_u128(amount));
    out
}

/// Receipt: `word(a) ‖ word(b) ‖ word(amount) ‖ word(expires_by) ‖ word(seq_no)`.
///
/// Signed by `b`, the payee, acknowledging that `a` may claim `amount`
/// from them as the `seq_no`-th receipt between the two.
pub fn encode_receipt(
    a: UserIndex,
    b: UserIndex,
    amount: u128,
    expires_by: u32,
    seq_no: u64,
) -> [u8; 5 * WORD_LENGTH] {
    let words = [
        word_from_u64(a),
        word_from_u64(b),
        word_from_u128(amount),
        word_from_u64(u64::from(expires_by)),
        word_from_u64(seq_no),
    ];
    let mut out = [0u8; 5 * WORD_LENGTH];
    for (chunk, word) in out.chunks_exact_mut(WORD_LENGTH).zip(words.iter()) {
        chunk.copy_from_slice(word);
    }
    out
}

/// The batch commitment signed by the submitter `a`.
///
/// Packed (not word-aligned): `b (8) ‖ amount (16) ‖ seq_no (8)` for each
/// receipt in batch order. Since the seq_nos are the ones the contract
/// assigns, `a` cannot sign a commitment for a batch at a different point
/// in the sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Commitment {
    bytes: Vec<u8>,
}

impl Commitment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for `receipts` entries without reallocating.
    pub fn with_capacity(receipts: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(receipts * COMMITMENT_ENTRY_LENGTH),
        }
    }

    /// Append one settled receipt.
    pub fn push(&mut self, b: UserIndex, amount: u128, seq_no: u64) {
        self.bytes.extend_from_slice(&b.to_be_bytes());
        self.bytes.extend_from_slice(&amount.to_be_bytes());
        self.bytes.extend_from_slice(&seq_no.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / COMMITMENT_ENTRY_LENGTH
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_one_padded_word() {
        let addr = Address::new([0x5A; 20]);
        let msg = encode_registration(&addr);
        assert_eq!(&msg[..12], &[0u8; 12]);
        assert_eq!(&msg[12..], addr.as_bytes());
    }

    #[test]
    fn withdrawal_layout() {
        let msg = encode_withdrawal(1, 100);
        assert_eq!(msg[31], 1);
        assert_eq!(msg[63], 100);
        assert_eq!(msg.iter().filter(|b| **b != 0).count(), 2);
    }

    #[test]
    fn receipt_layout() {
        let msg = encode_receipt(1, 2, 50, 3_600, 1);
        let word = |i: usize| &msg[i * 32..(i + 1) * 32];
        assert_eq!(word(0)[31], 1);
        assert_eq!(word(1)[31], 2);
        assert_eq!(word(2)[31], 50);
        assert_eq!(&word(3)[30..], &3_600u16.to_be_bytes());
        assert_eq!(word(4)[31], 1);
    }

    #[test]
    fn receipt_binds_every_field() {
        let base = encode_receipt(1, 2, 50, 3_600, 1);
        assert_ne!(base, encode_receipt(2, 1, 50, 3_600, 1));
        assert_ne!(base, encode_receipt(1, 2, 51, 3_600, 1));
        assert_ne!(base, encode_receipt(1, 2, 50, 7_200, 1));
        assert_ne!(base, encode_receipt(1, 2, 50, 3_600, 2));
    }

    #[test]
    fn commitment_packs_32_bytes_per_receipt() {
        let mut c = Commitment::with_capacity(2);
        assert!(c.is_empty());
        c.push(2, 50, 1);
        c.push(3, u128::MAX, 9);
        assert_eq!(c.len(), 2);

        let bytes = c.as_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[..8], &2u64.to_be_bytes());
        assert_eq!(&bytes[8..24], &50u128.to_be_bytes());
        assert_eq!(&bytes[24..32], &1u64.to_be_bytes());
        assert_eq!(&bytes[40..56], &[0xFF; 16]);
    }
}
