// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Registry
//!
//! Binds a dense user index to an address and a BLS public key, once and
//! forever.
//!
//! ## Proof of possession
//!
//! Aggregate verification only sees the *product* of pairings, so it cannot
//! tell `pk_a + pk_b` apart from any other pair of keys with the same sum.
//! An attacker who registers `pk_a = s·G2 − pk_b` can then sign a whole
//! batch "from" `b` with nothing but `s`. Requiring every registrant to
//! sign their own address under the key they register closes that door:
//! producing the proof needs the discrete log of `pk_a`, which the attacker
//! does not have.

use tally_protocol::config::BLS_DOMAIN;
use tally_protocol::crypto::{hash_to_point, verify_single, PublicKey, Signature};
use tally_protocol::storage::{Journal, Store};
use tally_protocol::wire::{encode_registration, PublicKeyWords, SignatureWords};
use tally_protocol::{Address, RegisteredUser, UserIndex};

use crate::error::ContractError;

/// Stage a new registration and return the index it will receive.
///
/// Any failure to parse or verify the key or the proof is reported as
/// [`ContractError::InvalidProofOfPossession`]; nothing is staged.
pub(crate) fn register<S: Store + ?Sized>(
    journal: &mut Journal<'_, S>,
    address: Address,
    public_key: &PublicKeyWords,
    proof: &SignatureWords,
) -> Result<UserIndex, ContractError> {
    let public_key =
        PublicKey::from_words(public_key).map_err(|_| ContractError::InvalidProofOfPossession)?;
    let proof = Signature::from_words(proof).map_err(|_| ContractError::InvalidProofOfPossession)?;
    let message = hash_to_point(BLS_DOMAIN, &encode_registration(&address))
        .map_err(|_| ContractError::InvalidProofOfPossession)?;

    if verify_single(&proof, &public_key, &message) != Ok(true) {
        return Err(ContractError::InvalidProofOfPossession);
    }

    let index = journal
        .user_count()?
        .checked_add(1)
        .ok_or(ContractError::CounterExhausted("user count"))?;
    journal.set_user_count(index);
    journal.put_user(
        index,
        RegisteredUser {
            address,
            public_key,
        },
    );

    tracing::debug!(index, address = %address, "registration staged");
    Ok(index)
}

/// Look up a registry entry, treating absence as an error.
pub(crate) fn lookup<S: Store + ?Sized>(
    journal: &Journal<'_, S>,
    index: UserIndex,
) -> Result<RegisteredUser, ContractError> {
    journal
        .user(index)?
        .ok_or(ContractError::UnregisteredUser(index))
}
