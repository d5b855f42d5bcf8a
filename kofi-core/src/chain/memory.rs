//! Deterministic single-process chain for tests and `--dev` relays.
//!
//! Admission checks mirror what a node does before a transaction enters the
//! mempool; execution happens lazily once the configured delay has passed.

use crate::chain::ChainClient;
use crate::error::{KofiError, Result};
use crate::transaction::{FunctionId, SignedTransaction};
use crate::types::{
    AccountAddress, ChainTransaction, PendingTransaction, TransactionHash, TransactionStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Gas units charged for every executed transaction.
pub const GAS_USED_PER_TRANSACTION: u64 = 10;

#[derive(Debug, Default, Clone, Copy)]
struct AccountState {
    sequence_number: u64,
    balance: u64,
}

#[derive(Debug)]
struct Entry {
    signed: SignedTransaction,
    status: TransactionStatus,
    ready_at: Instant,
    version: Option<u64>,
    gas_used: Option<u64>,
}

#[derive(Debug, Default)]
struct ChainState {
    accounts: HashMap<AccountAddress, AccountState>,
    transactions: HashMap<TransactionHash, Entry>,
    pending: VecDeque<TransactionHash>,
    failing_functions: HashMap<FunctionId, String>,
    next_version: u64,
}

pub struct InMemoryChain {
    chain_id: u8,
    execution_delay: Duration,
    state: Mutex<ChainState>,
    queries: AtomicUsize,
}

impl InMemoryChain {
    pub fn new(chain_id: u8) -> Self {
        Self {
            chain_id,
            execution_delay: Duration::ZERO,
            state: Mutex::new(ChainState::default()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Keep accepted transactions pending for `delay` before executing them.
    pub fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = delay;
        self
    }

    pub fn fund(&self, address: AccountAddress, amount: u64) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Make every executed call to `function` abort with `vm_status`.
    pub fn fail_function(&self, function: FunctionId, vm_status: impl Into<String>) {
        self.state
            .lock()
            .failing_functions
            .insert(function, vm_status.into());
    }

    pub fn balance_of(&self, address: AccountAddress) -> u64 {
        let mut state = self.state.lock();
        execute_ready(&mut state, Instant::now());
        state.accounts.get(&address).map(|a| a.balance).unwrap_or(0)
    }

    /// Every transaction the chain has accepted so far.
    pub fn accepted_transactions(&self) -> Vec<SignedTransaction> {
        self.state
            .lock()
            .transactions
            .values()
            .map(|entry| entry.signed.clone())
            .collect()
    }

    /// Number of `ChainClient` calls served.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn count_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }

    fn admit(&self, state: &ChainState, signed: &SignedTransaction) -> Result<()> {
        let tx = signed.transaction();
        let raw = tx.raw();

        if raw.chain_id != self.chain_id {
            return Err(KofiError::transaction(format!(
                "BAD_CHAIN_ID: expected {}, got {}",
                self.chain_id, raw.chain_id
            )));
        }

        if raw.expiration_timestamp_secs <= Utc::now().timestamp().max(0) as u64 {
            return Err(KofiError::transaction("TRANSACTION_EXPIRED"));
        }

        let message = tx.signing_message()?;
        let sender_auth = signed.sender_authorization().inner();
        if sender_auth.signer_address() != raw.sender || !sender_auth.verify(&message) {
            return Err(KofiError::transaction(
                "INVALID_SIGNATURE: sender authorization does not match transaction",
            ));
        }

        match (tx.fee_payer(), signed.fee_payer_authorization()) {
            (Some(fee_payer), Some(auth)) => {
                let auth = auth.inner();
                if auth.signer_address() != fee_payer || !auth.verify(&message) {
                    return Err(KofiError::transaction(
                        "INVALID_SIGNATURE: fee payer authorization does not match transaction",
                    ));
                }
            }
            (Some(_), None) => {
                return Err(KofiError::transaction(
                    "INVALID_SIGNATURE: missing fee payer authorization",
                ));
            }
            (None, Some(_)) => {
                return Err(KofiError::transaction(
                    "INVALID_SIGNATURE: fee payer authorization on a self-paid transaction",
                ));
            }
            (None, None) => {}
        }

        let sender = state.accounts.get(&raw.sender).copied().unwrap_or_default();
        if raw.sequence_number < sender.sequence_number {
            return Err(KofiError::transaction(format!(
                "SEQUENCE_NUMBER_TOO_OLD: account {} expects {}, got {}",
                raw.sender, sender.sequence_number, raw.sequence_number
            )));
        }
        if raw.sequence_number > sender.sequence_number {
            return Err(KofiError::transaction(format!(
                "SEQUENCE_NUMBER_TOO_NEW: account {} expects {}, got {}",
                raw.sender, sender.sequence_number, raw.sequence_number
            )));
        }

        let gas_payer = tx.fee_payer().unwrap_or(raw.sender);
        let max_fee = raw.max_gas_amount.saturating_mul(raw.gas_unit_price);
        let payer_balance = state.accounts.get(&gas_payer).map(|a| a.balance).unwrap_or(0);
        if payer_balance < max_fee {
            return Err(KofiError::transaction(format!(
                "INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE: {} has {}, needs {}",
                gas_payer, payer_balance, max_fee
            )));
        }

        if let Some((_, amount)) = transfer_of(signed) {
            let reserved = if gas_payer == raw.sender { max_fee } else { 0 };
            let needed = amount.saturating_add(reserved);
            if sender.balance < needed {
                return Err(KofiError::transaction(format!(
                    "Simulation failed: INSUFFICIENT_BALANCE: sender {} has {}, transfer requires {}",
                    raw.sender, sender.balance, needed
                )));
            }
        }

        Ok(())
    }
}

fn transfer_of(signed: &SignedTransaction) -> Option<(AccountAddress, u64)> {
    let payload = signed.transaction().payload();
    let function = &payload.function;
    let is_transfer = function.address.as_bytes()[..31].iter().all(|b| *b == 0)
        && function.address.as_bytes()[31] == 1
        && function.module == "aptos_account"
        && (function.name == "transfer" || function.name == "transfer_coins");

    if !is_transfer || payload.arguments.len() != 2 {
        return None;
    }

    Some((
        payload.arguments[0].as_address()?,
        payload.arguments[1].as_u64()?,
    ))
}

fn execute_ready(state: &mut ChainState, now: Instant) {
    while let Some(hash) = state.pending.front().copied() {
        let ready = state
            .transactions
            .get(&hash)
            .map(|entry| entry.ready_at <= now)
            .unwrap_or(true);
        if !ready {
            break;
        }
        state.pending.pop_front();
        execute(state, &hash);
    }
}

fn execute(state: &mut ChainState, hash: &TransactionHash) {
    let Some(entry) = state.transactions.get(hash) else {
        return;
    };
    let signed = entry.signed.clone();
    let raw = signed.transaction().raw().clone();
    let gas_payer = signed.transaction().fee_payer().unwrap_or(raw.sender);

    let gas_used = GAS_USED_PER_TRANSACTION.min(raw.max_gas_amount);
    let fee = gas_used.saturating_mul(raw.gas_unit_price);
    let payer = state.accounts.entry(gas_payer).or_default();
    payer.balance = payer.balance.saturating_sub(fee);

    let status = if let Some(vm_status) = state.failing_functions.get(&raw.payload.function) {
        TransactionStatus::Failed {
            vm_status: vm_status.clone(),
        }
    } else if let Some((recipient, amount)) = transfer_of(&signed) {
        let sender_balance = state.accounts.get(&raw.sender).map(|a| a.balance).unwrap_or(0);
        if sender_balance < amount {
            TransactionStatus::Failed {
                vm_status: "Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006)".to_string(),
            }
        } else {
            state.accounts.entry(raw.sender).or_default().balance -= amount;
            let to = state.accounts.entry(recipient).or_default();
            to.balance = to.balance.saturating_add(amount);
            TransactionStatus::Executed
        }
    } else {
        TransactionStatus::Executed
    };

    let version = state.next_version;
    state.next_version += 1;

    if let Some(entry) = state.transactions.get_mut(hash) {
        tracing::debug!("Executed {} at version {}: {:?}", hash, version, status);
        entry.status = status;
        entry.version = Some(version);
        entry.gas_used = Some(gas_used);
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn chain_id(&self) -> Result<u8> {
        self.count_query();
        Ok(self.chain_id)
    }

    async fn sequence_number(&self, address: AccountAddress) -> Result<u64> {
        self.count_query();
        let state = self.state.lock();
        Ok(state
            .accounts
            .get(&address)
            .map(|a| a.sequence_number)
            .unwrap_or(0))
    }

    async fn balance(&self, address: AccountAddress, _coin_type: &str) -> Result<u64> {
        self.count_query();
        Ok(self.balance_of(address))
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<PendingTransaction> {
        self.count_query();
        let hash = transaction.hash()?;

        let mut state = self.state.lock();
        execute_ready(&mut state, Instant::now());
        self.admit(&state, transaction)?;

        let sender = transaction.transaction().sender();
        state.accounts.entry(sender).or_default().sequence_number += 1;
        state.transactions.insert(
            hash,
            Entry {
                signed: transaction.clone(),
                status: TransactionStatus::Pending,
                ready_at: Instant::now() + self.execution_delay,
                version: None,
                gas_used: None,
            },
        );
        state.pending.push_back(hash);

        tracing::debug!("Accepted {} from {}", hash, sender);
        Ok(PendingTransaction { hash })
    }

    async fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<Option<ChainTransaction>> {
        self.count_query();
        let mut state = self.state.lock();
        execute_ready(&mut state, Instant::now());

        Ok(state.transactions.get(hash).map(|entry| ChainTransaction {
            hash: *hash,
            sender: entry.signed.transaction().sender(),
            sequence_number: entry.signed.transaction().sequence_number(),
            status: entry.status.clone(),
            version: entry.version,
            gas_used: entry.gas_used,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::AccountKey;
    use crate::transaction::test_helpers::{raw_transaction, transfer_payload};
    use crate::transaction::{FeePayerAuthorization, RawTransaction, UnsignedTransaction};

    fn sponsored(
        sender: &AccountKey,
        sponsor: &AccountKey,
        raw: RawTransaction,
    ) -> SignedTransaction {
        let tx = UnsignedTransaction::new(raw, Some(sponsor.address()));
        let sender_auth = sender.sign_as_sender(&tx).unwrap();
        let sponsor_auth = FeePayerAuthorization::new(sponsor.sign_message(&tx.signing_message().unwrap()));
        SignedTransaction::with_fee_payer(tx, sender_auth, sponsor_auth)
    }

    #[tokio::test]
    async fn test_sponsored_transfer_executes() {
        let chain = InMemoryChain::new(4);
        let sender = AccountKey::generate();
        let sponsor = AccountKey::generate();
        let recipient = AccountAddress::new([7u8; 32]);
        chain.fund(sender.address(), 1_000);
        chain.fund(sponsor.address(), 1_000_000);

        let mut raw = raw_transaction(sender.address(), 0);
        raw.payload = transfer_payload(recipient, 400);
        let signed = sponsored(&sender, &sponsor, raw);

        let pending = chain.submit(&signed).await.unwrap();
        let tx = chain.transaction_by_hash(&pending.hash).await.unwrap().unwrap();

        assert_eq!(tx.status, TransactionStatus::Executed);
        assert_eq!(chain.balance_of(sender.address()), 600);
        assert_eq!(chain.balance_of(recipient), 400);
        // gas charged to the sponsor, not the sender
        assert_eq!(
            chain.balance_of(sponsor.address()),
            1_000_000 - GAS_USED_PER_TRANSACTION * 100
        );
        assert_eq!(chain.sequence_number(sender.address()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_tampered_transaction() {
        let chain = InMemoryChain::new(4);
        let sender = AccountKey::generate();
        let sponsor = AccountKey::generate();
        chain.fund(sender.address(), 1_000);
        chain.fund(sponsor.address(), 1_000_000);

        let signed = sponsored(&sender, &sponsor, raw_transaction(sender.address(), 0));

        // re-wrap the sender's signature around a different amount
        let mut raw = signed.transaction().raw().clone();
        raw.payload = transfer_payload(AccountAddress::new([7u8; 32]), 999);
        let tampered_tx = UnsignedTransaction::new(raw, Some(sponsor.address()));
        let sponsor_auth =
            FeePayerAuthorization::new(sponsor.sign_message(&tampered_tx.signing_message().unwrap()));
        let tampered = SignedTransaction::with_fee_payer(
            tampered_tx,
            signed.sender_authorization().clone(),
            sponsor_auth,
        );

        let err = chain.submit(&tampered).await.unwrap_err();
        assert!(err.to_string().contains("INVALID_SIGNATURE"));
    }

    #[tokio::test]
    async fn test_sequence_number_conflicts() {
        let chain = InMemoryChain::new(4);
        let sender = AccountKey::generate();
        let sponsor = AccountKey::generate();
        chain.fund(sender.address(), 1_000);
        chain.fund(sponsor.address(), 1_000_000);

        let first = sponsored(&sender, &sponsor, raw_transaction(sender.address(), 0));
        chain.submit(&first).await.unwrap();

        let replay = chain.submit(&first).await.unwrap_err();
        assert!(replay.to_string().contains("SEQUENCE_NUMBER_TOO_OLD"));

        let skipped = sponsored(&sender, &sponsor, raw_transaction(sender.address(), 5));
        let err = chain.submit(&skipped).await.unwrap_err();
        assert!(err.to_string().contains("SEQUENCE_NUMBER_TOO_NEW"));
    }

    #[tokio::test]
    async fn test_insufficient_balance_fails_simulation() {
        let chain = InMemoryChain::new(4);
        let sender = AccountKey::generate();
        let sponsor = AccountKey::generate();
        chain.fund(sponsor.address(), 1_000_000);

        let signed = sponsored(&sender, &sponsor, raw_transaction(sender.address(), 0));
        let err = chain.submit(&signed).await.unwrap_err();
        assert!(matches!(err, KofiError::TransactionError(_)));
        assert!(err.to_string().starts_with("Simulation failed: INSUFFICIENT_BALANCE"));
        assert_eq!(chain.sequence_number(sender.address()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_execution_delay_and_injected_failure() {
        let chain = InMemoryChain::new(4).with_execution_delay(Duration::from_millis(50));
        let sender = AccountKey::generate();
        let sponsor = AccountKey::generate();
        chain.fund(sender.address(), 1_000);
        chain.fund(sponsor.address(), 1_000_000);

        let signed = sponsored(&sender, &sponsor, raw_transaction(sender.address(), 0));
        chain.fail_function(
            signed.transaction().payload().function.clone(),
            "Move abort: ENOT_ALLOWED",
        );
        let pending = chain.submit(&signed).await.unwrap();

        let tx = chain.transaction_by_hash(&pending.hash).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let tx = chain.transaction_by_hash(&pending.hash).await.unwrap().unwrap();
        assert_eq!(
            tx.status,
            TransactionStatus::Failed {
                vm_status: "Move abort: ENOT_ALLOWED".to_string()
            }
        );
    }
}
