//! Client side of sponsored submission.

use crate::api::{
    ErrorResponse, FeePayerResponse, SubmitTransactionRequest, SubmitTransactionResponse,
    FEE_PAYER_PATH, SUBMIT_TRANSACTION_PATH, TRANSACTION_ERROR_PREFIX,
};
use crate::chain::ChainClient;
use crate::envelope::TransportEnvelope;
use crate::error::{KofiError, Result};
use crate::signer::ClientSigner;
use crate::transaction::{BuildOptions, EntryFunction, TransactionBuilder};
use crate::types::{AccountAddress, ChainTransaction, TransactionHash};
use crate::waiter::{ConfirmationWaiter, WaitConfig};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

/// Something that co-signs and submits envelopes: a relay over HTTP or in-process.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Address that must be named in the fee payer slot.
    async fn fee_payer(&self) -> Result<AccountAddress>;

    async fn submit(&self, envelope: &TransportEnvelope) -> Result<TransactionHash>;
}

pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KofiError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error_message(resp: reqwest::Response) -> String {
        let body = resp.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body)
    }
}

#[async_trait]
impl Relay for RelayClient {
    async fn fee_payer(&self) -> Result<AccountAddress> {
        let resp = self.client.get(self.url(FEE_PAYER_PATH)).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(KofiError::network_connection(format!(
                "Relay returned {}: {}",
                status,
                Self::error_message(resp).await
            )));
        }

        let body: FeePayerResponse = resp.json().await?;
        Ok(body.fee_payer)
    }

    async fn submit(&self, envelope: &TransportEnvelope) -> Result<TransactionHash> {
        let request = SubmitTransactionRequest {
            serialized_data: Some(envelope.as_str().to_string()),
        };

        let resp = self
            .client
            .post(self.url(SUBMIT_TRANSACTION_PATH))
            .json(&request)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let body: SubmitTransactionResponse = resp.json().await?;
                Ok(body.transaction_hash)
            }
            StatusCode::BAD_REQUEST => {
                let message = Self::error_message(resp).await;
                Err(KofiError::malformed_envelope(strip(&message, "Malformed envelope: ")))
            }
            StatusCode::FORBIDDEN => {
                let message = Self::error_message(resp).await;
                Err(KofiError::not_fee_payer(strip(&message, "Not fee payer: ")))
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                let message = Self::error_message(resp).await;
                match message.strip_prefix(TRANSACTION_ERROR_PREFIX) {
                    Some(rejection) => Err(KofiError::transaction(rejection)),
                    None => Err(KofiError::network_connection(format!(
                        "Relay returned {}: {}",
                        StatusCode::INTERNAL_SERVER_ERROR,
                        message
                    ))),
                }
            }
            // gateway errors, proxies, timeouts: the submission may have landed
            status => {
                let message = Self::error_message(resp).await;
                Err(KofiError::network_connection(format!(
                    "Relay returned {}: {}",
                    status,
                    strip(&message, "Network connection error: ")
                )))
            }
        }
    }
}

fn strip(message: &str, prefix: &str) -> String {
    message.strip_prefix(prefix).unwrap_or(message).to_string()
}

/// How often a chain rejection may be answered with a freshly built transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildPolicy {
    pub max_rebuilds: u32,
}

impl RebuildPolicy {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn up_to(max_rebuilds: u32) -> Self {
        Self { max_rebuilds }
    }
}

/// Build, sign, encode, relay and (optionally) wait: one user action.
pub struct SponsoredSender {
    chain: Arc<dyn ChainClient>,
    builder: TransactionBuilder,
    signer: Arc<ClientSigner>,
    relay: Arc<dyn Relay>,
    waiter: ConfirmationWaiter,
    policy: RebuildPolicy,
}

impl SponsoredSender {
    pub fn new(chain: Arc<dyn ChainClient>, signer: Arc<ClientSigner>, relay: Arc<dyn Relay>) -> Self {
        Self {
            builder: TransactionBuilder::new(chain.clone()),
            waiter: ConfirmationWaiter::new(chain.clone(), WaitConfig::default()),
            chain,
            signer,
            relay,
            policy: RebuildPolicy::never(),
        }
    }

    pub fn with_build_options(mut self, options: BuildOptions) -> Self {
        self.builder = self.builder.with_options(options);
        self
    }

    pub fn with_wait_config(mut self, config: WaitConfig) -> Self {
        self.waiter = ConfirmationWaiter::new(self.chain.clone(), config);
        self
    }

    pub fn with_rebuild_policy(mut self, policy: RebuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Submit `payload` through the relay and return its hash without waiting.
    ///
    /// A signed envelope is sent at most once. Only a chain rejection can lead
    /// to another attempt, and that attempt is built and signed from scratch.
    pub async fn submit(&self, payload: EntryFunction) -> Result<TransactionHash> {
        let sender = self
            .signer
            .address()
            .ok_or_else(|| KofiError::signing_unavailable("No wallet connected; reconnect wallet"))?;
        let fee_payer = self.relay.fee_payer().await?;

        let mut rebuilds = 0;
        loop {
            let transaction = self
                .builder
                .build(sender, payload.clone(), Some(fee_payer))
                .await?;
            let authorization = self.signer.sign(&transaction).await?;
            let envelope = TransportEnvelope::encode(&transaction, &authorization)?;

            match self.relay.submit(&envelope).await {
                Ok(hash) => {
                    tracing::info!(
                        "Relay accepted {} (seq {})",
                        hash,
                        transaction.sequence_number()
                    );
                    return Ok(hash);
                }
                Err(e) if e.is_rebuildable() && rebuilds < self.policy.max_rebuilds => {
                    rebuilds += 1;
                    tracing::warn!(
                        "Chain rejected transaction ({}), rebuilding (attempt {}/{})",
                        e,
                        rebuilds,
                        self.policy.max_rebuilds
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Submit and wait for a terminal status.
    pub async fn send(&self, payload: EntryFunction) -> Result<ChainTransaction> {
        let hash = self.submit(payload).await?;
        self.waiter.wait(&hash).await
    }

    pub fn waiter(&self) -> &ConfirmationWaiter {
        &self.waiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;
    use crate::relay::SponsorRelay;
    use crate::signer::{AccountKey, LocalAccount, SigningCapability};
    use crate::transaction::{payloads, SenderAuthorization, UnsignedTransaction};
    use crate::types::TransactionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWallet {
        inner: LocalAccount,
        address: AccountAddress,
        signatures: AtomicUsize,
        reject: bool,
    }

    impl CountingWallet {
        fn new(key: AccountKey, reject: bool) -> Arc<Self> {
            Arc::new(Self {
                address: key.address(),
                inner: LocalAccount::new(key),
                signatures: AtomicUsize::new(0),
                reject,
            })
        }
    }

    #[async_trait]
    impl SigningCapability for CountingWallet {
        fn address(&self) -> AccountAddress {
            self.address
        }

        async fn authorize(&self, tx: &UnsignedTransaction) -> Result<SenderAuthorization> {
            if self.reject {
                return Err(KofiError::UserRejected);
            }
            self.signatures.fetch_add(1, Ordering::SeqCst);
            self.inner.authorize(tx).await
        }
    }

    /// Fails every submission with a fixed error.
    struct FailingRelay {
        fee_payer: AccountAddress,
        error: fn() -> KofiError,
        submissions: AtomicUsize,
    }

    #[async_trait]
    impl Relay for FailingRelay {
        async fn fee_payer(&self) -> Result<AccountAddress> {
            Ok(self.fee_payer)
        }

        async fn submit(&self, _: &TransportEnvelope) -> Result<TransactionHash> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
    }

    fn fast_wait() -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            max_poll_interval: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_sponsored_send_end_to_end() {
        let chain = Arc::new(InMemoryChain::new(4).with_execution_delay(Duration::from_millis(30)));
        let sponsor = AccountKey::generate();
        let sender = AccountKey::generate();
        let recipient = AccountAddress::new([7u8; 32]);
        chain.fund(sponsor.address(), 1_000_000_000);
        chain.fund(sender.address(), 500);

        let relay = Arc::new(SponsorRelay::new(chain.clone(), sponsor.clone()));
        let signer = Arc::new(ClientSigner::connected(Arc::new(LocalAccount::new(sender.clone()))));
        let client = SponsoredSender::new(chain.clone(), signer, relay).with_wait_config(fast_wait());

        let tx = client
            .send(payloads::pay(Some(recipient), 200).unwrap())
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Executed);
        assert_eq!(tx.sender, sender.address());
        assert_eq!(chain.balance_of(sender.address()), 300);
        assert_eq!(chain.balance_of(recipient), 200);
        assert!(chain.balance_of(sponsor.address()) < 1_000_000_000);
    }

    #[tokio::test]
    async fn test_user_rejection_sends_nothing() {
        let chain = Arc::new(InMemoryChain::new(4));
        let wallet = CountingWallet::new(AccountKey::generate(), true);
        let relay = Arc::new(FailingRelay {
            fee_payer: AccountAddress::new([2u8; 32]),
            error: || KofiError::transaction("unreachable"),
            submissions: AtomicUsize::new(0),
        });

        let client = SponsoredSender::new(
            chain,
            Arc::new(ClientSigner::connected(wallet)),
            relay.clone(),
        );
        let err = client.submit(payloads::spin(None, None).unwrap()).await.unwrap_err();

        assert!(matches!(err, KofiError::UserRejected));
        assert_eq!(relay.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rebuilds_only_after_chain_rejection() {
        let cases: Vec<(fn() -> KofiError, usize)> = vec![
            (|| KofiError::transaction("SEQUENCE_NUMBER_TOO_OLD"), 3),
            (|| KofiError::network_connection("timed out"), 1),
            (|| KofiError::malformed_envelope("corrupt"), 1),
            (|| KofiError::not_fee_payer("wrong relay"), 1),
        ];

        for (error, expected_attempts) in cases {
            let chain = Arc::new(InMemoryChain::new(4));
            let wallet = CountingWallet::new(AccountKey::generate(), false);
            let relay = Arc::new(FailingRelay {
                fee_payer: AccountAddress::new([2u8; 32]),
                error,
                submissions: AtomicUsize::new(0),
            });

            let client = SponsoredSender::new(
                chain,
                Arc::new(ClientSigner::connected(wallet.clone())),
                relay.clone(),
            )
            .with_rebuild_policy(RebuildPolicy::up_to(2));

            assert!(client.submit(payloads::spin(None, None).unwrap()).await.is_err());
            assert_eq!(relay.submissions.load(Ordering::SeqCst), expected_attempts);
            // every attempt carried its own fresh signature
            assert_eq!(wallet.signatures.load(Ordering::SeqCst), expected_attempts);
        }
    }

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let chain = Arc::new(InMemoryChain::new(4));
        let relay = Arc::new(SponsorRelay::new(chain.clone(), AccountKey::generate()));
        let client = SponsoredSender::new(chain, Arc::new(ClientSigner::new()), relay);

        assert!(matches!(
            client.submit(payloads::spin(None, None).unwrap()).await,
            Err(KofiError::SigningUnavailable(_))
        ));
    }
}
