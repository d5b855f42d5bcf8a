//! Server side of sponsored submission: co-sign as fee payer and submit.

use crate::chain::ChainClient;
use crate::client::Relay;
use crate::envelope::TransportEnvelope;
use crate::error::{KofiError, Result};
use crate::signer::AccountKey;
use crate::transaction::SignedTransaction;
use crate::types::{AccountAddress, SubmissionResult, TransactionHash};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SponsorRelay<C: ?Sized = dyn ChainClient> {
    chain: Arc<C>,
    sponsor: AccountKey,
    // one fee payer credential, so sign-and-submit runs one request at a time
    submit_lock: Mutex<()>,
}

impl<C: ChainClient + ?Sized> SponsorRelay<C> {
    pub fn new(chain: Arc<C>, sponsor: AccountKey) -> Self {
        tracing::info!("Sponsor relay using fee payer {}", sponsor.address());
        Self {
            chain,
            sponsor,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn fee_payer_address(&self) -> AccountAddress {
        self.sponsor.address()
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    /// Decode, check the slot names this relay, co-sign, submit once.
    ///
    /// The sender authorization is passed through untouched; the chain decides
    /// whether it is valid. Chain rejections are returned as-is and never retried.
    pub async fn relay(&self, envelope: &TransportEnvelope) -> Result<SubmissionResult> {
        let (transaction, sender_auth) = envelope.decode()?;
        let fee_payer = self.fee_payer_address();

        match transaction.fee_payer() {
            Some(slot) if slot == fee_payer => {}
            Some(slot) => {
                tracing::warn!(
                    "Rejecting transaction from {}: fee payer slot names {}",
                    transaction.sender(),
                    slot
                );
                return Err(KofiError::not_fee_payer(format!(
                    "Transaction names fee payer {}, this relay is {}",
                    slot, fee_payer
                )));
            }
            None => {
                tracing::warn!(
                    "Rejecting self-paid transaction from {}",
                    transaction.sender()
                );
                return Err(KofiError::not_fee_payer(
                    "Transaction has no fee payer slot reserved",
                ));
            }
        }

        let sender = transaction.sender();
        let sequence_number = transaction.sequence_number();

        let _guard = self.submit_lock.lock().await;

        let fee_payer_auth = self.sponsor.sign_as_fee_payer(&transaction)?;
        let signed = SignedTransaction::with_fee_payer(transaction, sender_auth, fee_payer_auth);

        let pending = match self.chain.submit(&signed).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(
                    "Chain rejected transaction from {} (seq {}): {}",
                    sender,
                    sequence_number,
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            "Submitted {} for {} (seq {}), gas paid by {}",
            pending.hash,
            sender,
            sequence_number,
            fee_payer
        );

        Ok(SubmissionResult {
            hash: pending.hash,
            sender,
            sequence_number,
            fee_payer,
            submitted_at: Utc::now(),
        })
    }
}

#[async_trait]
impl<C: ChainClient + ?Sized> Relay for SponsorRelay<C> {
    async fn fee_payer(&self) -> Result<AccountAddress> {
        Ok(self.fee_payer_address())
    }

    async fn submit(&self, envelope: &TransportEnvelope) -> Result<TransactionHash> {
        Ok(self.relay(envelope).await?.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;
    use crate::transaction::{payloads, TransactionBuilder, UnsignedTransaction};
    use crate::types::TransactionStatus;

    struct Setup {
        chain: Arc<InMemoryChain>,
        relay: Arc<SponsorRelay<InMemoryChain>>,
        builder: TransactionBuilder,
    }

    fn setup() -> Setup {
        let chain = Arc::new(InMemoryChain::new(4));
        let sponsor = AccountKey::generate();
        chain.fund(sponsor.address(), 1_000_000_000_000);
        Setup {
            relay: Arc::new(SponsorRelay::new(chain.clone(), sponsor)),
            builder: TransactionBuilder::new(chain.clone()),
            chain,
        }
    }

    async fn envelope_for(
        setup: &Setup,
        sender: &AccountKey,
        fee_payer: Option<AccountAddress>,
    ) -> TransportEnvelope {
        let to = AccountAddress::new([7u8; 32]);
        let tx = setup
            .builder
            .build(sender.address(), payloads::pay(Some(to), 100).unwrap(), fee_payer)
            .await
            .unwrap();
        let auth = sender.sign_as_sender(&tx).unwrap();
        TransportEnvelope::encode(&tx, &auth).unwrap()
    }

    #[tokio::test]
    async fn test_relays_valid_envelope() {
        let setup = setup();
        let sender = AccountKey::generate();
        setup.chain.fund(sender.address(), 1_000);

        let envelope = envelope_for(&setup, &sender, Some(setup.relay.fee_payer_address())).await;
        let result = setup.relay.relay(&envelope).await.unwrap();

        assert_eq!(result.sender, sender.address());
        assert_eq!(result.sequence_number, 0);
        assert_eq!(result.fee_payer, setup.relay.fee_payer_address());

        let tx = setup
            .chain
            .transaction_by_hash(&result.hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Executed);
    }

    #[tokio::test]
    async fn test_malformed_envelope_never_reaches_chain() {
        let setup = setup();
        let before = setup.chain.query_count();

        for text in ["", "bm90IGFuIGVudmVsb3Bl", "***"] {
            let err = setup.relay.relay(&TransportEnvelope::from(text)).await.unwrap_err();
            assert!(matches!(err, KofiError::MalformedEnvelope(_)));
        }
        assert_eq!(setup.chain.query_count(), before);
    }

    #[tokio::test]
    async fn test_not_fee_payer() {
        let setup = setup();
        let sender = AccountKey::generate();
        setup.chain.fund(sender.address(), 1_000);

        let self_paid = envelope_for(&setup, &sender, None).await;
        let other = envelope_for(&setup, &sender, Some(AccountAddress::new([3u8; 32]))).await;
        let before = setup.chain.query_count();

        for envelope in [self_paid, other] {
            let err = setup.relay.relay(&envelope).await.unwrap_err();
            assert!(matches!(err, KofiError::NotFeePayer(_)));
        }
        assert_eq!(setup.chain.query_count(), before);
    }

    #[tokio::test]
    async fn test_insufficient_balance_surfaces_chain_message() {
        let setup = setup();
        let sender = AccountKey::generate();

        let envelope = envelope_for(&setup, &sender, Some(setup.relay.fee_payer_address())).await;
        let err = setup.relay.relay(&envelope).await.unwrap_err();

        assert!(matches!(err, KofiError::TransactionError(_)));
        assert!(err
            .to_string()
            .starts_with("Simulation failed: INSUFFICIENT_BALANCE"));
    }

    #[tokio::test]
    async fn test_sequential_submissions_increase_sequence_number() {
        let setup = setup();
        let sender = AccountKey::generate();
        setup.chain.fund(sender.address(), 1_000);
        let fee_payer = Some(setup.relay.fee_payer_address());

        let first = envelope_for(&setup, &sender, fee_payer).await;
        let first = setup.relay.relay(&first).await.unwrap();
        let second = envelope_for(&setup, &sender, fee_payer).await;
        let second = setup.relay.relay(&second).await.unwrap();

        assert_eq!(first.sequence_number, 0);
        assert_eq!(second.sequence_number, 1);
        assert_ne!(first.hash, second.hash);
    }

    #[tokio::test]
    async fn test_tampered_envelope_is_not_repaired() {
        let setup = setup();
        let sender = AccountKey::generate();
        setup.chain.fund(sender.address(), 1_000);

        let tx = setup
            .builder
            .build(
                sender.address(),
                payloads::pay(Some(AccountAddress::new([7u8; 32])), 100).unwrap(),
                Some(setup.relay.fee_payer_address()),
            )
            .await
            .unwrap();
        let auth = sender.sign_as_sender(&tx).unwrap();

        let mut raw = tx.raw().clone();
        raw.payload = payloads::pay(Some(AccountAddress::new([7u8; 32])), 900).unwrap();
        let tampered = UnsignedTransaction::new(raw, tx.fee_payer());
        let envelope = TransportEnvelope::encode(&tampered, &auth).unwrap();

        let err = setup.relay.relay(&envelope).await.unwrap_err();
        assert!(matches!(err, KofiError::TransactionError(_)));
        assert!(err.to_string().contains("INVALID_SIGNATURE"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_senders_are_serialized() {
        let setup = setup();
        let fee_payer = Some(setup.relay.fee_payer_address());

        let mut envelopes = Vec::new();
        for _ in 0..10 {
            let sender = AccountKey::generate();
            setup.chain.fund(sender.address(), 1_000);
            envelopes.push(envelope_for(&setup, &sender, fee_payer).await);
        }

        let tasks: Vec<_> = envelopes
            .into_iter()
            .map(|envelope| {
                let relay = setup.relay.clone();
                tokio::spawn(async move { relay.relay(&envelope).await })
            })
            .collect();

        let mut hashes = Vec::new();
        for task in tasks {
            hashes.push(task.await.unwrap().unwrap().hash);
        }
        hashes.sort_by_key(|h| h.to_hex());
        hashes.dedup();
        assert_eq!(hashes.len(), 10);
        assert_eq!(setup.chain.accepted_transactions().len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_submit_once() {
        let setup = setup();
        let sender = AccountKey::generate();
        setup.chain.fund(sender.address(), 1_000);
        let envelope = envelope_for(&setup, &sender, Some(setup.relay.fee_payer_address())).await;

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let relay = setup.relay.clone();
                let envelope = envelope.clone();
                tokio::spawn(async move { relay.relay(&envelope).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => {
                    assert!(matches!(e, KofiError::TransactionError(_)));
                    assert!(e.to_string().contains("SEQUENCE_NUMBER_TOO_OLD"));
                }
            }
        }

        assert_eq!(accepted, 1);
        let on_chain = setup.chain.accepted_transactions();
        assert_eq!(on_chain.len(), 1);
        assert!(on_chain[0].fee_payer_authorization().is_some());
    }
}
