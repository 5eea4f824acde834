//! Integration tests for batch settlement through `post()`.
//!
//! Every batch here is signed the way a real client would sign it: each
//! payee signs its receipt at the seq_no the contract will assign, and the
//! submitter signs the packed commitment.

mod common;

use common::{Harness, User};
use tally_contracts::{CallOutcome, ContractError};
use tally_protocol::config::{BLS_DOMAIN, CYCLE_LENGTH_SECS};
use tally_protocol::crypto::Signature;
use tally_protocol::wire::{encode_registration, Call, ReceiptBatch, WireError, WireReceipt};

/// Snapshot of everything a batch between `a` and `bs` could touch.
fn snapshot(h: &Harness, a: &User, bs: &[&User]) -> Vec<u128> {
    let mut out = vec![h.balance(a), h.contract.security_deposit(a.index).unwrap()];
    for b in bs {
        out.push(h.balance(b));
        out.push(h.contract.security_deposit(b.index).unwrap());
        out.push(u128::from(h.contract.record(a.index, b.index).unwrap()));
    }
    out
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[test]
fn single_receipt_moves_balance_and_bumps_seq_no() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    let batch = h.batch(&a, &[(&b, 50)]);
    let summary = h.contract.post(&Harness::calldata(batch)).unwrap();

    assert_eq!(h.balance(&a), 50);
    assert_eq!(h.balance(&b), 50);
    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 1);

    assert_eq!(summary.a_index, a.index);
    assert_eq!(summary.total_credited, 50);
    assert_eq!(summary.receipts.len(), 1);
    assert_eq!(summary.receipts[0].seq_no, 1);
    assert!(!summary.receipts[0].slashed);
    assert_eq!(summary.expires_by, h.contract.current_cycle_expiry());
}

#[test]
fn many_payees_settle_in_one_call() {
    let mut h = Harness::new();
    let a = h.register(1);
    let payees: Vec<User> = (2..7).map(|seed| h.funded(seed, 1_000)).collect();

    let receipts: Vec<(&User, u128)> = payees
        .iter()
        .enumerate()
        .map(|(i, b)| (b, 100 * (i as u128 + 1)))
        .collect();
    let batch = h.batch(&a, &receipts);
    let summary = h.contract.post(&Harness::calldata(batch)).unwrap();

    assert_eq!(summary.total_credited, 100 + 200 + 300 + 400 + 500);
    assert_eq!(h.balance(&a), 1_500);
    for (i, b) in payees.iter().enumerate() {
        assert_eq!(h.balance(b), 1_000 - 100 * (i as u128 + 1));
        assert_eq!(h.contract.record(a.index, b.index).unwrap(), 1);
    }
}

#[test]
fn consecutive_batches_advance_the_sequence() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    for expected_seq in 1..=3u64 {
        let batch = h.batch(&a, &[(&b, 10)]);
        let summary = h.contract.post(&Harness::calldata(batch)).unwrap();
        assert_eq!(summary.receipts[0].seq_no, expected_seq);
    }
    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 3);
    assert_eq!(h.balance(&b), 70);
}

#[test]
fn pair_counters_are_directed() {
    let mut h = Harness::new();
    let a = h.funded(1, 100);
    let b = h.funded(2, 100);

    let batch = h.batch(&a, &[(&b, 10)]);
    h.contract.post(&Harness::calldata(batch)).unwrap();
    let batch = h.batch(&b, &[(&a, 5)]);
    h.contract.post(&Harness::calldata(batch)).unwrap();

    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 1);
    assert_eq!(h.contract.record(b.index, a.index).unwrap(), 1);
    assert_eq!(h.balance(&a), 105);
    assert_eq!(h.balance(&b), 95);
}

#[test]
fn empty_batch_verifies_commitment_only() {
    let mut h = Harness::new();
    let a = h.funded(1, 10);

    let batch = h.batch(&a, &[]);
    assert!(batch.receipts.is_empty());
    let summary = h.contract.post(&Harness::calldata(batch)).unwrap();
    assert_eq!(summary.total_credited, 0);
    assert_eq!(h.balance(&a), 10);

    // An empty batch still needs a's signature.
    let unsigned = ReceiptBatch {
        a_index: a.index,
        signature: Signature::aggregate(&[]).to_bytes(),
        receipts: vec![],
    };
    assert!(matches!(
        h.contract.post(&Harness::calldata(unsigned)),
        Err(ContractError::InvalidAggregateSignature)
    ));
}

// ---------------------------------------------------------------------------
// Replay and atomicity
// ---------------------------------------------------------------------------

#[test]
fn replaying_a_batch_fails() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    let calldata = Harness::calldata(h.batch(&a, &[(&b, 50)]));
    h.contract.post(&calldata).unwrap();
    let before = snapshot(&h, &a, &[&b]);

    // Second submission reconstructs seq_no 2; the signatures were over 1.
    assert!(matches!(
        h.contract.post(&calldata),
        Err(ContractError::InvalidAggregateSignature)
    ));
    assert_eq!(snapshot(&h, &a, &[&b]), before);
}

#[test]
fn corrupted_signature_leaves_state_untouched() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);
    let c = h.funded(3, 20);
    h.contract.post_security_deposit(c.index, 500).unwrap();
    let before = snapshot(&h, &a, &[&b, &c]);

    // A valid curve point that is the wrong signature.
    let mut batch = h.batch(&a, &[(&b, 40), (&c, 60)]);
    batch.signature = c.sign(b"something else").to_bytes();
    assert!(matches!(
        h.contract.post(&Harness::calldata(batch)),
        Err(ContractError::InvalidAggregateSignature)
    ));
    assert_eq!(snapshot(&h, &a, &[&b, &c]), before);

    // Not a curve point at all.
    let mut batch = h.batch(&a, &[(&b, 40), (&c, 60)]);
    batch.signature = [0xAB; 64];
    assert!(matches!(
        h.contract.post(&Harness::calldata(batch)),
        Err(ContractError::InvalidAggregateSignature)
    ));
    assert_eq!(snapshot(&h, &a, &[&b, &c]), before);
}

#[test]
fn batch_signed_in_an_earlier_cycle_fails() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    let calldata = Harness::calldata(h.batch(&a, &[(&b, 50)]));
    h.clock.advance(CYCLE_LENGTH_SECS);
    assert!(matches!(
        h.contract.post(&calldata),
        Err(ContractError::InvalidAggregateSignature)
    ));
    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 0);
}

#[test]
fn inflated_amount_breaks_the_aggregate() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 1_000);

    let mut batch = h.batch(&a, &[(&b, 50)]);
    batch.receipts[0].amount = 500;
    assert!(matches!(
        h.contract.post(&Harness::calldata(batch)),
        Err(ContractError::InvalidAggregateSignature)
    ));
    assert_eq!(h.balance(&b), 1_000);
}

// ---------------------------------------------------------------------------
// Slashing
// ---------------------------------------------------------------------------

#[test]
fn short_balance_is_clamped_and_deposit_slashed() {
    let mut h = Harness::new();
    let a = h.funded(1, 7);
    let b = h.funded(2, 30);
    h.contract.post_security_deposit(b.index, 200).unwrap();

    let batch = h.batch(&a, &[(&b, 50)]);
    let summary = h.contract.post(&Harness::calldata(batch)).unwrap();

    assert_eq!(h.balance(&b), 0);
    assert_eq!(h.balance(&a), 7 + 30);
    assert_eq!(h.contract.security_deposit(b.index).unwrap(), 0);
    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 1);

    let r = summary.receipts[0];
    assert_eq!((r.requested, r.transferred, r.slashed), (50, 30, true));
    assert_eq!(summary.slashed_count(), 1);
}

#[test]
fn exact_balance_is_not_a_slash() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 50);
    h.contract.post_security_deposit(b.index, 10).unwrap();

    let batch = h.batch(&a, &[(&b, 50)]);
    let summary = h.contract.post(&Harness::calldata(batch)).unwrap();
    assert!(!summary.receipts[0].slashed);
    assert_eq!(h.balance(&b), 0);
    assert_eq!(h.contract.security_deposit(b.index).unwrap(), 10);
}

#[test]
fn duplicate_payee_uses_consecutive_seq_nos_and_running_balance() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);
    h.contract.post_security_deposit(b.index, 25).unwrap();

    let batch = h.batch(&a, &[(&b, 60), (&b, 60)]);
    let summary = h.contract.post(&Harness::calldata(batch)).unwrap();

    assert_eq!(summary.receipts[0].seq_no, 1);
    assert_eq!(summary.receipts[1].seq_no, 2);
    assert_eq!(summary.receipts[0].transferred, 60);
    assert_eq!(summary.receipts[1].transferred, 40);
    assert!(summary.receipts[1].slashed);

    assert_eq!(h.balance(&a), 100);
    assert_eq!(h.balance(&b), 0);
    assert_eq!(h.contract.security_deposit(b.index).unwrap(), 0);
    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 2);
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[test]
fn self_settlement_is_rejected() {
    let mut h = Harness::new();
    let a = h.funded(1, 100);
    let batch = h.batch(&a, &[(&a, 10)]);
    assert!(matches!(
        h.contract.post(&Harness::calldata(batch)),
        Err(ContractError::SelfSettlement(1))
    ));
    assert_eq!(h.contract.record(a.index, a.index).unwrap(), 0);
}

#[test]
fn unregistered_participants_are_rejected() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    let mut batch = h.batch(&a, &[(&b, 10)]);
    batch.receipts.push(WireReceipt {
        b_index: 77,
        amount: 1,
    });
    assert!(matches!(
        h.contract.post(&Harness::calldata(batch)),
        Err(ContractError::UnregisteredUser(77))
    ));

    let mut batch = h.batch(&a, &[(&b, 10)]);
    batch.a_index = 55;
    assert!(matches!(
        h.contract.post(&Harness::calldata(batch)),
        Err(ContractError::UnregisteredUser(55))
    ));
    assert_eq!(h.balance(&b), 100);
}

#[test]
fn malformed_calldata_is_rejected_before_state() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    let mut calldata = Harness::calldata(h.batch(&a, &[(&b, 10)]));
    calldata.pop();
    assert!(matches!(
        h.contract.post(&calldata),
        Err(ContractError::MalformedCalldata(WireError::LengthMismatch { .. }))
    ));

    // Count says two receipts, only one follows.
    let mut calldata = Harness::calldata(h.batch(&a, &[(&b, 10)]));
    calldata[13] = 2;
    assert!(matches!(
        h.contract.post(&calldata),
        Err(ContractError::MalformedCalldata(_))
    ));

    let other = Call::ProcessWithdrawal { index: 1 }.encode().unwrap();
    assert!(matches!(
        h.contract.post(&other),
        Err(ContractError::MalformedCalldata(WireError::UnknownSelector(_)))
    ));
    assert_eq!(h.contract.record(a.index, b.index).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn execute_runs_every_call_kind() {
    let mut h = Harness::new();
    let a = h.register(1);

    // Register through raw calldata.
    let sk = tally_protocol::crypto::SecretKey::from_seed(b"via-execute");
    let address = tally_protocol::Address::new([0x42; 20]);
    let proof = sk.sign(BLS_DOMAIN, &encode_registration(&address)).unwrap();
    let register = Call::Register {
        address,
        public_key: sk.public_key().to_words(),
        proof: proof.to_words(),
    }
    .encode()
    .unwrap();
    let executed = h.contract.execute(&register).unwrap();
    assert_eq!(executed.call, "register");
    assert_eq!(executed.outcome, CallOutcome::Registered { index: 2 });
    assert!(executed.commit.entries >= 2);

    let b = User {
        index: 2,
        address,
        sk,
    };
    h.contract.fund_account(b.index, 80).unwrap();

    let post = Harness::calldata(h.batch(&a, &[(&b, 30)]));
    let executed = h.contract.execute(&post).unwrap();
    match executed.outcome {
        CallOutcome::Settled(summary) => assert_eq!(summary.total_credited, 30),
        other => panic!("expected Settled, got {other:?}"),
    }

    let init = Call::InitWithdraw {
        index: a.index,
        amount: 30,
        signature: a.sign_withdrawal(1, 30),
    }
    .encode()
    .unwrap();
    assert_eq!(h.contract.execute(&init).unwrap().call, "initWithdraw");

    h.clock.advance(tally_protocol::config::BUFFER_PERIOD_SECS);
    let process = Call::ProcessWithdrawal { index: a.index }.encode().unwrap();
    let executed = h.contract.execute(&process).unwrap();
    assert!(matches!(
        executed.outcome,
        CallOutcome::WithdrawalProcessed { index: 1, .. }
    ));
    assert_eq!(h.balance(&a), 0);
}

#[test]
fn execute_rejects_garbage() {
    let mut h = Harness::new();
    assert!(matches!(
        h.contract.execute(&[0xFF; 3]),
        Err(ContractError::MalformedCalldata(WireError::Truncated { .. }))
    ));
    assert!(matches!(
        h.contract.execute(&[0xFF; 36]),
        Err(ContractError::MalformedCalldata(WireError::UnknownSelector(_)))
    ));
}

#[test]
fn settled_outcome_serializes_with_a_type_tag() {
    let mut h = Harness::new();
    let a = h.register(1);
    let b = h.funded(2, 100);

    let post = Harness::calldata(h.batch(&a, &[(&b, 40)]));
    let executed = h.contract.execute(&post).unwrap();
    let json = serde_json::to_value(&executed.outcome).unwrap();

    assert_eq!(json["type"], "settled");
    assert_eq!(json["a_index"], 1);
    assert_eq!(json["total_credited"], 40);
    assert_eq!(json["receipts"][0]["seq_no"], 1);
    assert_eq!(json["receipts"][0]["slashed"], false);
}
