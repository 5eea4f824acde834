//! Integration tests for the withdrawal state machine.

mod common;

use common::{Harness, START};
use tally_contracts::ContractError;
use tally_protocol::config::BUFFER_PERIOD_SECS;
use tally_protocol::treasury::{Payout, PayoutLog};
use tally_protocol::{Account, PendingWithdrawal};

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn init_wait_finalize() {
    let mut h = Harness::new();
    let _alice = h.register(1);
    let bob = h.funded(2, 500);

    let sig = bob.sign_withdrawal(1, 100);
    let pending = h.contract.init_withdraw(bob.index, 100, &sig).unwrap();
    assert_eq!(pending.amount, 100);
    assert_eq!(pending.valid_after, START + BUFFER_PERIOD_SECS);

    // Too early.
    let early = h.contract.process_withdrawal(bob.index);
    assert!(matches!(early, Err(ContractError::WithdrawalNotReady { .. })));

    h.clock.advance(BUFFER_PERIOD_SECS);
    let payout = h.contract.process_withdrawal(bob.index).unwrap();
    assert_eq!(
        payout,
        Payout {
            to: bob.address,
            amount: 100
        }
    );

    assert_eq!(
        h.contract.account(bob.index).unwrap(),
        Account {
            balance: 400,
            nonce: 1
        }
    );
    assert_eq!(
        h.contract.pending_withdrawal(bob.index).unwrap(),
        PendingWithdrawal::NONE
    );
    assert_eq!(h.treasury.payouts(), vec![payout]);
}

#[test]
fn timelock_boundary_is_inclusive() {
    let mut h = Harness::new();
    let user = h.funded(1, 100);
    let pending = h
        .contract
        .init_withdraw(user.index, 10, &user.sign_withdrawal(1, 10))
        .unwrap();

    h.clock.set(pending.valid_after - 1);
    match h.contract.process_withdrawal(user.index) {
        Err(ContractError::WithdrawalNotReady { now, valid_after }) => {
            assert_eq!(now, pending.valid_after - 1);
            assert_eq!(valid_after, pending.valid_after);
        }
        other => panic!("expected WithdrawalNotReady, got {other:?}"),
    }

    h.clock.set(pending.valid_after);
    assert!(h.contract.process_withdrawal(user.index).is_ok());
}

#[test]
fn second_intent_overrides_the_first() {
    let mut h = Harness::new();
    let user = h.funded(1, 1_000);

    h.contract
        .init_withdraw(user.index, 100, &user.sign_withdrawal(1, 100))
        .unwrap();
    h.clock.advance(BUFFER_PERIOD_SECS / 2);
    let second = h
        .contract
        .init_withdraw(user.index, 300, &user.sign_withdrawal(1, 300))
        .unwrap();

    assert_eq!(second.amount, 300);
    assert_eq!(second.valid_after, START + BUFFER_PERIOD_SECS / 2 + BUFFER_PERIOD_SECS);

    // The first timer no longer counts.
    h.clock.set(START + BUFFER_PERIOD_SECS);
    assert!(matches!(
        h.contract.process_withdrawal(user.index),
        Err(ContractError::WithdrawalNotReady { .. })
    ));

    h.clock.set(second.valid_after);
    assert_eq!(h.contract.process_withdrawal(user.index).unwrap().amount, 300);
    assert_eq!(h.balance(&user), 700);
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[test]
fn finalize_without_intent_fails() {
    let mut h = Harness::new();
    let user = h.funded(1, 100);
    assert!(matches!(
        h.contract.process_withdrawal(user.index),
        Err(ContractError::NoPendingWithdrawal(1))
    ));
}

#[test]
fn signature_over_wrong_amount_fails() {
    let mut h = Harness::new();
    let user = h.funded(1, 100);
    let result = h
        .contract
        .init_withdraw(user.index, 100, &user.sign_withdrawal(1, 99));
    assert!(matches!(result, Err(ContractError::InvalidWithdrawalSignature)));
    assert!(!h.contract.pending_withdrawal(user.index).unwrap().is_pending());
}

#[test]
fn signature_by_another_user_fails() {
    let mut h = Harness::new();
    let alice = h.funded(1, 100);
    let mallory = h.register(2);
    let result = h
        .contract
        .init_withdraw(alice.index, 50, &mallory.sign_withdrawal(1, 50));
    assert!(matches!(result, Err(ContractError::InvalidWithdrawalSignature)));
}

#[test]
fn finalized_intent_cannot_be_replayed() {
    let mut h = Harness::new();
    let user = h.funded(1, 1_000);
    let sig = user.sign_withdrawal(1, 100);

    h.contract.init_withdraw(user.index, 100, &sig).unwrap();
    h.clock.advance(BUFFER_PERIOD_SECS);
    h.contract.process_withdrawal(user.index).unwrap();

    // Nonce is now 1, so the contract expects a signature over nonce 2.
    let replay = h.contract.init_withdraw(user.index, 100, &sig);
    assert!(matches!(replay, Err(ContractError::InvalidWithdrawalSignature)));

    h.contract
        .init_withdraw(user.index, 100, &user.sign_withdrawal(2, 100))
        .unwrap();
}

#[test]
fn insufficient_balance_at_finalize_fails_and_keeps_intent() {
    let mut h = Harness::new();
    let user = h.funded(1, 50);
    h.contract
        .init_withdraw(user.index, 80, &user.sign_withdrawal(1, 80))
        .unwrap();
    h.clock.advance(BUFFER_PERIOD_SECS);

    match h.contract.process_withdrawal(user.index) {
        Err(ContractError::InsufficientBalance {
            available,
            required,
        }) => {
            assert_eq!(available, 50);
            assert_eq!(required, 80);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    assert!(h.contract.pending_withdrawal(user.index).unwrap().is_pending());
    assert_eq!(h.balance(&user), 50);
}

#[test]
fn unregistered_user_cannot_init() {
    let mut h = Harness::new();
    let user = h.register(1);
    let result = h
        .contract
        .init_withdraw(42, 1, &user.sign_withdrawal(1, 1));
    assert!(matches!(result, Err(ContractError::UnregisteredUser(42))));
}

#[test]
fn treasury_refusal_rolls_back_finalize() {
    let mut h = Harness::with_treasury(PayoutLog::with_reserve(10));
    let user = h.funded(1, 500);
    h.contract
        .init_withdraw(user.index, 100, &user.sign_withdrawal(1, 100))
        .unwrap();
    h.clock.advance(BUFFER_PERIOD_SECS);

    let result = h.contract.process_withdrawal(user.index);
    assert!(matches!(
        result,
        Err(ContractError::TransferFailed { amount: 100, .. })
    ));

    // Nothing moved: balance, nonce and the pending intent are intact.
    assert_eq!(
        h.contract.account(user.index).unwrap(),
        Account {
            balance: 500,
            nonce: 0
        }
    );
    assert!(h.contract.pending_withdrawal(user.index).unwrap().is_pending());
    assert!(h.treasury.payouts().is_empty());
    assert_eq!(h.treasury.reserve(), Some(10));
}

#[test]
fn finalize_is_permissionless_and_one_shot() {
    let mut h = Harness::new();
    let user = h.funded(1, 100);
    h.contract
        .init_withdraw(user.index, 100, &user.sign_withdrawal(1, 100))
        .unwrap();
    h.clock.advance(BUFFER_PERIOD_SECS + 1);

    // No signature needed to finalize, anyone may push it through.
    h.contract.process_withdrawal(user.index).unwrap();
    assert!(matches!(
        h.contract.process_withdrawal(user.index),
        Err(ContractError::NoPendingWithdrawal(_))
    ));
    assert_eq!(h.balance(&user), 0);
}
