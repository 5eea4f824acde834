// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Key Tooling
//!
//! Client-side helpers behind the `init`, `keygen` and `sign-withdrawal`
//! subcommands: BLS key files on disk, and the calldata a wallet submits
//! for registration and withdrawal.
//!
//! Key files hold the hex-encoded compressed secret scalar and nothing
//! else. On Unix they are created with mode `0600`.

use std::path::Path;

use anyhow::{Context, Result};
use tally_protocol::config::BLS_DOMAIN;
use tally_protocol::crypto::SecretKey;
use tally_protocol::wire::{encode_registration, encode_withdrawal, Call};
use tally_protocol::{Address, UserIndex};

/// Write `sk` to `path`, replacing any existing file.
pub fn write_key_file(path: &Path, sk: &SecretKey) -> Result<()> {
    std::fs::write(path, hex::encode(sk.to_bytes()))
        .with_context(|| format!("failed to write key to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Read a key written by [`write_key_file`].
pub fn read_key_file(path: &Path) -> Result<SecretKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    parse_secret_key(text.trim())
        .with_context(|| format!("key file {} is malformed", path.display()))
}

/// Parse a hex-encoded secret key, with or without a `0x` prefix.
pub fn parse_secret_key(s: &str) -> Result<SecretKey> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).context("secret key is not hex")?;
    Ok(SecretKey::from_bytes(&bytes)?)
}

/// `register` calldata for `address`, with the proof of possession signed
/// by `sk`.
pub fn registration_calldata(sk: &SecretKey, address: Address) -> Result<Vec<u8>> {
    let proof = sk.sign(BLS_DOMAIN, &encode_registration(&address))?;
    let call = Call::Register {
        address,
        public_key: sk.public_key().to_words(),
        proof: proof.to_words(),
    };
    Ok(call.encode()?)
}

/// `initWithdraw` calldata for user `index`.
///
/// `nonce` must be the account's current nonce plus one.
pub fn withdrawal_calldata(
    sk: &SecretKey,
    index: UserIndex,
    nonce: u64,
    amount: u128,
) -> Result<Vec<u8>> {
    let signature = sk.sign(BLS_DOMAIN, &encode_withdrawal(nonce, amount))?;
    let call = Call::InitWithdraw {
        index,
        amount,
        signature: signature.to_words(),
    };
    Ok(call.encode()?)
}
