// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **SHA-256**: everything that ends up inside a signature or a
//!   selector, i.e. hash-to-curve rounds and operation selectors. The settlement
//!   target has a SHA-256 precompile, so anything a contract must recompute
//!   uses it.
//! - **BLAKE3**: local bookkeeping only, such as the change-set digests
//!   reported by the node. Never part of a signed payload.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 over several byte slices without concatenating them first.
pub fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Four-byte operation selector: the first four bytes of
/// `SHA-256(signature)`, e.g. `selector("processWithdrawal(uint64)")`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = sha256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}
