//! Shared fixtures for the contract integration tests.
//!
//! A `Harness` is a fresh contract over an in-memory ledger, a manual clock
//! and a payout log, plus the client-side signing a wallet would do.

#![allow(dead_code)]

use tally_contracts::ReceiptContract;
use tally_protocol::clock::{Clock, ManualClock};
use tally_protocol::config::BLS_DOMAIN;
use tally_protocol::crypto::{SecretKey, Signature};
use tally_protocol::storage::MemoryStore;
use tally_protocol::treasury::PayoutLog;
use tally_protocol::wire::{
    encode_receipt, encode_registration, encode_withdrawal, Call, Commitment, ReceiptBatch,
    SignatureWords, WireReceipt,
};
use tally_protocol::{Address, UserIndex};

/// 2023-11-14T22:13:20Z, comfortably inside a cycle.
pub const START: u64 = 1_700_000_000;

pub type TestContract = ReceiptContract<MemoryStore, ManualClock, PayoutLog>;

/// A registered user and the secret only their wallet knows.
pub struct User {
    pub index: UserIndex,
    pub address: Address,
    pub sk: SecretKey,
}

impl User {
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.sk.sign(BLS_DOMAIN, message).unwrap()
    }

    /// Sign a withdrawal intent for `nonce` (the account nonce plus one).
    pub fn sign_withdrawal(&self, nonce: u64, amount: u128) -> SignatureWords {
        self.sign(&encode_withdrawal(nonce, amount)).to_words()
    }
}

pub struct Harness {
    pub contract: TestContract,
    pub clock: ManualClock,
    pub treasury: PayoutLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_treasury(PayoutLog::unlimited())
    }

    pub fn with_treasury(treasury: PayoutLog) -> Self {
        let clock = ManualClock::new(START);
        let contract = ReceiptContract::new(MemoryStore::new(), clock.clone(), treasury.clone());
        Self {
            contract,
            clock,
            treasury,
        }
    }

    /// Register a user whose key and address derive from `seed`.
    pub fn register(&mut self, seed: u8) -> User {
        let sk = SecretKey::from_seed(&[b'u', seed]);
        let address = Address::new([seed; 20]);
        let proof = sk
            .sign(BLS_DOMAIN, &encode_registration(&address))
            .unwrap();
        let index = self
            .contract
            .register(address, &sk.public_key().to_words(), &proof.to_words())
            .unwrap();
        User { index, address, sk }
    }

    /// Register and fund a user in one go.
    pub fn funded(&mut self, seed: u8, balance: u128) -> User {
        let user = self.register(seed);
        if balance > 0 {
            self.contract.fund_account(user.index, balance).unwrap();
        }
        user
    }

    pub fn balance(&self, user: &User) -> u128 {
        self.contract.account(user.index).unwrap().balance
    }

    /// Build a correctly signed batch for `a`, assuming the next seq_no of
    /// each pair is what the contract will assign.
    pub fn batch(&self, a: &User, receipts: &[(&User, u128)]) -> ReceiptBatch {
        let expires_by = self.clock.current_cycle_expiry();
        let mut next_seq = std::collections::HashMap::new();
        let mut sigs = Vec::new();
        let mut commitment = Commitment::new();
        let mut wire = Vec::new();

        for (b, amount) in receipts {
            let seq = next_seq
                .entry(b.index)
                .or_insert_with(|| self.contract.record(a.index, b.index).unwrap());
            *seq += 1;
            sigs.push(b.sign(&encode_receipt(a.index, b.index, *amount, expires_by, *seq)));
            commitment.push(b.index, *amount, *seq);
            wire.push(WireReceipt {
                b_index: b.index,
                amount: *amount,
            });
        }
        sigs.push(a.sign(commitment.as_bytes()));

        ReceiptBatch {
            a_index: a.index,
            signature: Signature::aggregate(&sigs).to_bytes(),
            receipts: wire,
        }
    }

    /// Full `post()` calldata for a batch.
    pub fn calldata(batch: ReceiptBatch) -> Vec<u8> {
        Call::Post(batch).encode().unwrap()
    }
}
