// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Protocol Configuration & Constants
//!
//! Every magic number in Tally lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Several of these values are baked into signatures that users produce
//! off-chain. Changing the domain tag or any encoding size after launch
//! invalidates every outstanding receipt, so choose wisely during devnet.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the settlement protocol.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Protocol fingerprint reported by the node's status endpoint.
pub const PROTOCOL_FINGERPRINT: &str = "ALAS-TALLY-2026";

// ---------------------------------------------------------------------------
// Network Names
// ---------------------------------------------------------------------------

/// Mainnet. Operator funding endpoints are disabled.
pub const NETWORK_MAINNET: &str = "mainnet";

/// Testnet. Operator funding endpoints are disabled.
pub const NETWORK_TESTNET: &str = "testnet";

/// Devnet. The node exposes `/devnet/fund` so you can mint balances and
/// security deposits out of thin air. Reset weekly, no promises.
pub const NETWORK_DEVNET: &str = "devnet";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Curve for BLS keys and signatures. BN254 because the settlement target
/// has pairing precompiles for it and nothing else.
pub const BLS_CURVE: &str = "BN254";

/// Domain separation tag for hash-to-curve. Shared by registration,
/// withdrawal, receipt and batch-commitment messages so that a signature
/// produced for Tally is meaningless to any other protocol hashing onto
/// the same curve.
pub const BLS_DOMAIN: &[u8] = b"TALLY-RECEIPTS-V01-BN254G1-SHA256-TAI";

/// Upper bound on try-and-increment rounds when hashing to G1. Each round
/// succeeds with probability ~1/2, so running out is a 2^-256 event.
pub const HASH_TO_CURVE_MAX_ATTEMPTS: u16 = 256;

/// Width of one ABI word. Field elements, indices and amounts are all
/// encoded as big-endian 32-byte words outside the compact batch layout.
pub const WORD_LENGTH: usize = 32;

/// A BLS public key on the wire: four words (G2 x.c1, x.c0, y.c1, y.c0).
pub const PUBLIC_KEY_WORDS: usize = 4;

/// A BLS signature on the wire: two words (G1 x, y).
pub const SIGNATURE_WORDS: usize = 2;

/// Encoded signature length in bytes.
pub const SIGNATURE_LENGTH: usize = SIGNATURE_WORDS * WORD_LENGTH;

/// Encoded public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = PUBLIC_KEY_WORDS * WORD_LENGTH;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Calldata Layout
// ---------------------------------------------------------------------------

/// Every call starts with a four-byte operation selector.
pub const SELECTOR_LENGTH: usize = 4;

/// `post()` header after the selector: a_index (8) + count (2) + signature (64).
pub const BATCH_HEADER_LENGTH: usize = 8 + 2 + SIGNATURE_LENGTH;

/// Offset of the first receipt in `post()` calldata (selector included).
pub const BATCH_RECEIPTS_OFFSET: usize = SELECTOR_LENGTH + BATCH_HEADER_LENGTH;

/// One compact receipt on the wire: b_index (8) + amount (16).
pub const RECEIPT_WIRE_LENGTH: usize = 8 + 16;

/// One receipt inside the batch commitment string: b_index (8) + amount (16) + seq_no (8).
pub const COMMITMENT_ENTRY_LENGTH: usize = 8 + 16 + 8;

/// Maximum receipts a single `post()` can carry. The count field is 16 bits.
pub const MAX_BATCH_RECEIPTS: usize = u16::MAX as usize;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// Challenge period between announcing a withdrawal and being allowed to
/// finalize it. One day gives counterparties time to settle outstanding
/// receipts against the withdrawing user before the money leaves.
///
/// Must be non-zero: `valid_after == 0` means "no pending withdrawal".
pub const BUFFER_PERIOD_SECS: u64 = 86_400;

/// Length of one settlement cycle. Receipts in a batch are bound to the
/// expiry of the cycle in which the batch is posted.
pub const CYCLE_LENGTH_SECS: u64 = 3_600;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default RPC API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns `true` for networks where operator funding is allowed.
pub fn allows_operator_funding(network: &str) -> bool {
    network == NETWORK_DEVNET
}

/// Returns `true` if `network` is one of the known network names.
pub fn is_known_network(network: &str) -> bool {
    matches!(network, NETWORK_MAINNET | NETWORK_TESTNET | NETWORK_DEVNET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_period_is_nonzero() {
        // The withdrawal sentinel depends on this.
        assert!(BUFFER_PERIOD_SECS > 0);
    }

    #[test]
    fn test_batch_layout_offsets() {
        assert_eq!(BATCH_RECEIPTS_OFFSET, 78);
        assert_eq!(RECEIPT_WIRE_LENGTH, 24);
        assert_eq!(COMMITMENT_ENTRY_LENGTH, 32);
    }

    #[test]
    fn test_key_and_signature_sizes() {
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(PUBLIC_KEY_LENGTH, 128);
    }

    #[test]
    fn test_domain_tag_is_ascii() {
        assert!(!BLS_DOMAIN.is_empty());
        assert!(BLS_DOMAIN.iter().all(|b| b.is_ascii_graphic()));
    }

    #[test]
    fn test_operator_funding_only_on_devnet() {
        assert!(allows_operator_funding(NETWORK_DEVNET));
        assert!(!allows_operator_funding(NETWORK_TESTNET));
        assert!(!allows_operator_funding(NETWORK_MAINNET));
    }

    #[test]
    fn test_known_networks() {
        assert!(is_known_network("devnet"));
        assert!(!is_known_network("moonnet"));
    }
}
