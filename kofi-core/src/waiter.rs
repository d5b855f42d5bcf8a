use crate::chain::ChainClient;
use crate::error::{KofiError, Result};
use crate::types::{ChainTransaction, TransactionHash};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(4),
        }
    }
}

impl WaitConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(KofiError::config("Poll interval must be greater than 0"));
        }
        if self.max_poll_interval < self.poll_interval {
            return Err(KofiError::config(
                "Max poll interval cannot be shorter than the poll interval",
            ));
        }
        Ok(())
    }
}

/// Polls the chain until a transaction is terminal or the wait budget runs out.
///
/// Giving up only ends the wait; the transaction itself may still execute.
pub struct ConfirmationWaiter {
    chain: Arc<dyn ChainClient>,
    config: WaitConfig,
}

impl ConfirmationWaiter {
    pub fn new(chain: Arc<dyn ChainClient>, config: WaitConfig) -> Self {
        Self { chain, config }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    pub async fn wait(&self, hash: &TransactionHash) -> Result<ChainTransaction> {
        self.wait_with_timeout(hash, self.config.timeout).await
    }

    pub async fn wait_with_timeout(
        &self,
        hash: &TransactionHash,
        timeout: Duration,
    ) -> Result<ChainTransaction> {
        self.config.validate()?;

        let deadline = Instant::now() + timeout;
        let mut delay = self.config.poll_interval;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.chain.transaction_by_hash(hash).await {
                Ok(Some(tx)) if tx.status.is_terminal() => {
                    tracing::info!(
                        "Transaction {} finished after {} poll(s): {:?}",
                        hash,
                        polls,
                        tx.status
                    );
                    return Ok(tx);
                }
                Ok(Some(_)) => tracing::debug!("Transaction {} still pending", hash),
                Ok(None) => tracing::debug!("Transaction {} not found yet", hash),
                Err(KofiError::NetworkConnection(e)) => {
                    tracing::warn!("Polling {} failed, will retry: {}", hash, e)
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("Gave up waiting for {} after {} poll(s)", hash, polls);
                return Err(KofiError::TimedOut {
                    hash: hash.to_hex(),
                });
            }

            tokio::time::sleep(delay.min(deadline - now)).await;
            delay = (delay * 2).min(self.config.max_poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;
    use crate::relay::SponsorRelay;
    use crate::envelope::TransportEnvelope;
    use crate::signer::AccountKey;
    use crate::transaction::{payloads, TransactionBuilder};
    use crate::types::{PendingTransaction, TransactionStatus};
    use crate::transaction::SignedTransaction;
    use crate::types::AccountAddress;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast() -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            max_poll_interval: Duration::from_millis(40),
        }
    }

    async fn submit_one(chain: Arc<InMemoryChain>) -> TransactionHash {
        let sponsor = AccountKey::generate();
        let sender = AccountKey::generate();
        chain.fund(sponsor.address(), 1_000_000_000);
        chain.fund(sender.address(), 1_000);

        let relay = SponsorRelay::new(chain.clone(), sponsor);
        let tx = TransactionBuilder::new(chain.clone())
            .build(
                sender.address(),
                payloads::spin(None, None).unwrap(),
                Some(relay.fee_payer_address()),
            )
            .await
            .unwrap();
        let envelope = TransportEnvelope::encode(&tx, &sender.sign_as_sender(&tx).unwrap()).unwrap();
        relay.relay(&envelope).await.unwrap().hash
    }

    #[tokio::test]
    async fn test_waits_for_execution() {
        let chain = Arc::new(InMemoryChain::new(4).with_execution_delay(Duration::from_millis(50)));
        let hash = submit_one(chain.clone()).await;

        let tx = ConfirmationWaiter::new(chain, fast()).wait(&hash).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Executed);
    }

    #[tokio::test]
    async fn test_reports_failed_status() {
        let chain = Arc::new(InMemoryChain::new(4));
        chain.fail_function(
            payloads::spin(None, None).unwrap().function,
            "Move abort: ENO_TICKETS",
        );
        let hash = submit_one(chain.clone()).await;

        let tx = ConfirmationWaiter::new(chain, fast()).wait(&hash).await.unwrap();
        assert_eq!(
            tx.status,
            TransactionStatus::Failed {
                vm_status: "Move abort: ENO_TICKETS".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_does_not_cancel_execution() {
        let chain = Arc::new(InMemoryChain::new(4).with_execution_delay(Duration::from_millis(300)));
        let hash = submit_one(chain.clone()).await;
        let waiter = ConfirmationWaiter::new(chain.clone(), fast());

        let err = waiter
            .wait_with_timeout(&hash, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, KofiError::TimedOut { ref hash } if hash.starts_with("0x")));

        tokio::time::sleep(Duration::from_millis(350)).await;
        let tx = chain.transaction_by_hash(&hash).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Executed);
    }

    #[tokio::test]
    async fn test_unknown_hash_times_out_with_backoff() {
        let chain = Arc::new(InMemoryChain::new(4));
        let waiter = ConfirmationWaiter::new(chain.clone(), fast());

        let err = waiter
            .wait_with_timeout(&TransactionHash::new([9u8; 32]), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, KofiError::TimedOut { .. }));
        // 10 + 20 + 40 + 40 ... ms, never a busy loop
        assert!(chain.query_count() <= 10, "polled {} times", chain.query_count());
    }

    /// Fails with a network error a few times before answering.
    struct FlakyChain {
        inner: Arc<InMemoryChain>,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl ChainClient for FlakyChain {
        async fn chain_id(&self) -> Result<u8> {
            self.inner.chain_id().await
        }

        async fn sequence_number(&self, address: AccountAddress) -> Result<u64> {
            self.inner.sequence_number(address).await
        }

        async fn balance(&self, address: AccountAddress, coin_type: &str) -> Result<u64> {
            self.inner.balance(address, coin_type).await
        }

        async fn submit(&self, transaction: &SignedTransaction) -> Result<PendingTransaction> {
            self.inner.submit(transaction).await
        }

        async fn transaction_by_hash(
            &self,
            hash: &TransactionHash,
        ) -> Result<Option<ChainTransaction>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(KofiError::network_connection("connection reset"));
            }
            self.inner.transaction_by_hash(hash).await
        }
    }

    #[tokio::test]
    async fn test_network_errors_count_as_pending() {
        let inner = Arc::new(InMemoryChain::new(4));
        let hash = submit_one(inner.clone()).await;
        let chain = Arc::new(FlakyChain {
            inner,
            failures_left: AtomicUsize::new(3),
        });

        let tx = ConfirmationWaiter::new(chain, fast()).wait(&hash).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Executed);
    }
}
