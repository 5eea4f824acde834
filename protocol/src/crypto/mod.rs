// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Cryptographic Primitives for Tally
//!
//! Every signature the settlement contract checks flows through here.
//!
//! - **BLS over BN254** for registration, withdrawal and receipt
//!   signatures. Receipts aggregate: a batch of N receipts carries one
//!   64-byte signature and costs one pairing product to verify.
//! - **SHA-256** for hash-to-curve rounds and call selectors.
//! - **BLAKE3** for local state digests.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Pairings and point arithmetic are arkworks. The only thing
//! defined here is the glue: encodings, domain separation, and a
//! verification API that cannot confuse "malformed" with "invalid".

pub mod bls;
pub mod hash;

pub use bls::{
    hash_to_point, verify_multiple, verify_single, BlsError, MessagePoint, PublicKey, SecretKey,
    Signature, Word,
};
pub use hash::{blake3_hash, selector, sha256, sha256_parts};
