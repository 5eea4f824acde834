// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Receipt Contract
//!
//! The facade every caller talks to. It owns the three collaborators
//! (storage, clock, treasury) and wraps each operation in the same
//! transaction shape:
//!
//! ```text
//! open Journal ──> stage writes, run checks ──> Err: drop journal, return
//!                                           └─> Ok:  treasury payout (if any)
//!                                                    └─> Store::apply(changes)
//! ```
//!
//! Methods take `&mut self`. A host that serves concurrent clients puts the
//! contract behind a mutex; index allocation and per-pair sequence numbers
//! then come out linearizable without any extra effort here.

use serde::Serialize;
use tally_protocol::clock::Clock;
use tally_protocol::config::SELECTOR_LENGTH;
use tally_protocol::crypto::PublicKey;
use tally_protocol::storage::{ChangeSet, Journal, Store};
use tally_protocol::treasury::{Payout, Treasury};
use tally_protocol::wire::{Call, PublicKeyWords, ReceiptBatch, SignatureWords, WireError};
use tally_protocol::{Account, Address, PairKey, PendingWithdrawal, UserIndex};

use crate::error::ContractError;
use crate::registry;
use crate::settlement::{self, SettlementSummary};
use crate::withdrawal;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a successfully executed call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallOutcome {
    Registered { index: UserIndex },
    WithdrawalInitiated { index: UserIndex, pending: PendingWithdrawal },
    WithdrawalProcessed { index: UserIndex, payout: Payout },
    Settled(SettlementSummary),
}

/// Bookkeeping about one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    /// Number of storage entries written.
    pub entries: usize,
    /// BLAKE3 digest of the committed change set.
    pub digest: [u8; 32],
}

/// A call's outcome together with its commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub call: &'static str,
    pub outcome: CallOutcome,
    pub commit: CommitInfo,
}

/// Value produced by a staged operation, plus the payout it needs at commit.
struct Staged<R> {
    value: R,
    payout: Option<Payout>,
}

impl<R> Staged<R> {
    fn plain(value: R) -> Self {
        Self {
            value,
            payout: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ReceiptContract
// ---------------------------------------------------------------------------

/// Registry, withdrawal manager and settlement engine over one ledger.
pub struct ReceiptContract<S, C, T> {
    store: S,
    clock: C,
    treasury: T,
}

impl<S: Store, C: Clock, T: Treasury> ReceiptContract<S, C, T> {
    pub fn new(store: S, clock: C, treasury: T) -> Self {
        Self {
            store,
            clock,
            treasury,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    // -- Transaction plumbing -----------------------------------------------

    fn transact<R>(
        &mut self,
        call: &'static str,
        op: impl FnOnce(&mut Journal<'_, S>, &C) -> Result<Staged<R>, ContractError>,
    ) -> Result<(R, CommitInfo), ContractError> {
        let staged = {
            let mut journal = Journal::new(&self.store);
            op(&mut journal, &self.clock).map(|staged| (staged, journal.into_changes()))
        };

        match staged {
            Ok((staged, changes)) => {
                let commit = self.commit(call, changes, staged.payout)?;
                Ok((staged.value, commit))
            }
            Err(err) => Err(self.reject(call, err)),
        }
    }

    fn reject(&self, call: &'static str, err: ContractError) -> ContractError {
        tracing::warn!(call, reason = err.kind(), error = %err, "call rejected");
        err
    }

    fn commit(
        &mut self,
        call: &'static str,
        changes: ChangeSet,
        payout: Option<Payout>,
    ) -> Result<CommitInfo, ContractError> {
        let info = CommitInfo {
            entries: changes.len(),
            digest: changes.digest()?,
        };

        if let Some(payout) = payout {
            if !self.treasury.transfer(&payout.to, payout.amount) {
                let err = ContractError::TransferFailed {
                    to: payout.to.to_hex(),
                    amount: payout.amount,
                };
                return Err(self.reject(call, err));
            }
        }

        if let Err(err) = self.store.apply(changes) {
            // The payout above already left. Nothing to undo it with.
            tracing::error!(call, error = %err, "commit failed after treasury transfer");
            return Err(err.into());
        }

        tracing::info!(
            call,
            entries = info.entries,
            digest = %hex::encode(info.digest),
            "call committed"
        );
        Ok(info)
    }

    // -- Registry -----------------------------------------------------------

    /// Register `address` with a BLS key, proven by a signature over the
    /// address. Returns the new user's index.
    pub fn register(
        &mut self,
        address: Address,
        public_key: &PublicKeyWords,
        proof: &SignatureWords,
    ) -> Result<UserIndex, ContractError> {
        self.register_with_commit(address, public_key, proof)
            .map(|(index, _)| index)
    }

    fn register_with_commit(
        &mut self,
        address: Address,
        public_key: &PublicKeyWords,
        proof: &SignatureWords,
    ) -> Result<(UserIndex, CommitInfo), ContractError> {
        self.transact("register", |journal, _| {
            registry::register(journal, address, public_key, proof).map(Staged::plain)
        })
    }

    // -- Withdrawals --------------------------------------------------------

    /// Announce a withdrawal of `amount`, signed over the next nonce.
    pub fn init_withdraw(
        &mut self,
        index: UserIndex,
        amount: u128,
        signature: &SignatureWords,
    ) -> Result<PendingWithdrawal, ContractError> {
        self.init_withdraw_with_commit(index, amount, signature)
            .map(|(pending, _)| pending)
    }

    fn init_withdraw_with_commit(
        &mut self,
        index: UserIndex,
        amount: u128,
        signature: &SignatureWords,
    ) -> Result<(PendingWithdrawal, CommitInfo), ContractError> {
        self.transact("initWithdraw", |journal, clock| {
            withdrawal::init_withdraw(journal, clock, index, amount, signature).map(Staged::plain)
        })
    }

    /// Finalize a pending withdrawal once its buffer period has passed.
    /// Anyone may call this.
    pub fn process_withdrawal(&mut self, index: UserIndex) -> Result<Payout, ContractError> {
        self.process_withdrawal_with_commit(index)
            .map(|(payout, _)| payout)
    }

    fn process_withdrawal_with_commit(
        &mut self,
        index: UserIndex,
    ) -> Result<(Payout, CommitInfo), ContractError> {
        self.transact("processWithdrawal", |journal, clock| {
            let payout = withdrawal::process_withdrawal(journal, clock, index)?;
            Ok(Staged {
                value: payout,
                payout: Some(payout),
            })
        })
    }

    // -- Settlement ---------------------------------------------------------

    /// Settle a batch from raw `post()` calldata, selector included.
    pub fn post(&mut self, calldata: &[u8]) -> Result<SettlementSummary, ContractError> {
        let batch = match Call::decode(calldata) {
            Ok(Call::Post(batch)) => batch,
            Ok(_) => {
                // Decoding succeeded, so the selector is there.
                let mut sel = [0u8; SELECTOR_LENGTH];
                sel.copy_from_slice(&calldata[..SELECTOR_LENGTH]);
                return Err(self.reject("post", WireError::UnknownSelector(sel).into()));
            }
            Err(err) => return Err(self.reject("post", err.into())),
        };
        self.post_batch(&batch)
    }

    /// Settle an already-decoded batch.
    pub fn post_batch(&mut self, batch: &ReceiptBatch) -> Result<SettlementSummary, ContractError> {
        self.post_batch_with_commit(batch).map(|(summary, _)| summary)
    }

    fn post_batch_with_commit(
        &mut self,
        batch: &ReceiptBatch,
    ) -> Result<(SettlementSummary, CommitInfo), ContractError> {
        let (summary, commit) = self.transact("post", |journal, clock| {
            settlement::settle(journal, clock.current_cycle_expiry(), batch).map(Staged::plain)
        })?;
        tracing::info!(
            a = summary.a_index,
            receipts = summary.receipts.len(),
            slashed = summary.slashed_count(),
            total_credited = summary.total_credited,
            "batch settled"
        );
        Ok((summary, commit))
    }

    // -- Dispatch -----------------------------------------------------------

    /// Decode and run any call.
    pub fn execute(&mut self, calldata: &[u8]) -> Result<Executed, ContractError> {
        match Call::decode(calldata) {
            Ok(call) => self.dispatch(call),
            Err(err) => Err(self.reject("decode", err.into())),
        }
    }

    /// Run an already-decoded call.
    pub fn dispatch(&mut self, call: Call) -> Result<Executed, ContractError> {
        let name = call.name();

        let (outcome, commit) = match call {
            Call::Register {
                address,
                public_key,
                proof,
            } => {
                let (index, commit) = self.register_with_commit(address, &public_key, &proof)?;
                (CallOutcome::Registered { index }, commit)
            }
            Call::InitWithdraw {
                index,
                amount,
                signature,
            } => {
                let (pending, commit) = self.init_withdraw_with_commit(index, amount, &signature)?;
                (CallOutcome::WithdrawalInitiated { index, pending }, commit)
            }
            Call::ProcessWithdrawal { index } => {
                let (payout, commit) = self.process_withdrawal_with_commit(index)?;
                (CallOutcome::WithdrawalProcessed { index, payout }, commit)
            }
            Call::Post(batch) => {
                let (summary, commit) = self.post_batch_with_commit(&batch)?;
                (CallOutcome::Settled(summary), commit)
            }
        };

        Ok(Executed {
            call: name,
            outcome,
            commit,
        })
    }

    // -- Ledger operator ----------------------------------------------------

    /// Credit a registered user's balance. Stands in for the base ledger's
    /// deposit path.
    pub fn fund_account(&mut self, index: UserIndex, amount: u128) -> Result<Account, ContractError> {
        self.transact("fundAccount", |journal, _| {
            registry::lookup(journal, index)?;
            let mut account = journal.account(index)?;
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(ContractError::BalanceOverflow(index))?;
            journal.put_account(index, account);
            Ok(Staged::plain(account))
        })
        .map(|(account, _)| account)
    }

    /// Add to a registered user's security deposit. Returns the new total.
    pub fn post_security_deposit(
        &mut self,
        index: UserIndex,
        amount: u128,
    ) -> Result<u128, ContractError> {
        self.transact("postSecurityDeposit", |journal, _| {
            registry::lookup(journal, index)?;
            let deposit = journal
                .security_deposit(index)?
                .checked_add(amount)
                .ok_or(ContractError::BalanceOverflow(index))?;
            journal.put_security_deposit(index, deposit);
            Ok(Staged::plain(deposit))
        })
        .map(|(deposit, _)| deposit)
    }

    // -- Views --------------------------------------------------------------

    pub fn user_count(&self) -> Result<u64, ContractError> {
        Ok(self.store.user_count()?)
    }

    pub fn user_address(&self, index: UserIndex) -> Result<Option<Address>, ContractError> {
        Ok(self.store.user(index)?.map(|u| u.address))
    }

    pub fn user_public_key(&self, index: UserIndex) -> Result<Option<PublicKey>, ContractError> {
        Ok(self.store.user(index)?.map(|u| u.public_key))
    }

    /// Last settled sequence number between `payer` and `payee`.
    pub fn record(&self, payer: UserIndex, payee: UserIndex) -> Result<u64, ContractError> {
        Ok(self.store.record(PairKey::new(payer, payee))?)
    }

    pub fn pending_withdrawal(&self, index: UserIndex) -> Result<PendingWithdrawal, ContractError> {
        Ok(self.store.withdrawal(index)?)
    }

    pub fn account(&self, index: UserIndex) -> Result<Account, ContractError> {
        Ok(self.store.account(index)?)
    }

    pub fn security_deposit(&self, index: UserIndex) -> Result<u128, ContractError> {
        Ok(self.store.security_deposit(index)?)
    }

    /// Expiry of the settlement cycle a batch posted now would be bound to.
    pub fn current_cycle_expiry(&self) -> u32 {
        self.clock.current_cycle_expiry()
    }
}
