use crate::chain::ChainClient;
use crate::config::NetworkConfig;
use crate::error::{KofiError, Result};
use crate::transaction::SignedTransaction;
use crate::types::{
    AccountAddress, ChainTransaction, PendingTransaction, TransactionHash, TransactionStatus,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const SIGNED_TRANSACTION_CONTENT_TYPE: &str = "application/x.kofi.signed_transaction+borsh";

/// Talks to a node's REST API.
#[derive(Clone)]
pub struct RestChainClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LedgerInfo {
    chain_id: u8,
}

#[derive(Debug, Deserialize)]
struct AccountResource {
    #[serde(deserialize_with = "u64_from_str")]
    sequence_number: u64,
}

#[derive(Debug, Deserialize)]
struct NodeError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NodeTransaction {
    PendingTransaction {
        hash: TransactionHash,
        sender: AccountAddress,
        #[serde(deserialize_with = "u64_from_str")]
        sequence_number: u64,
    },
    UserTransaction {
        hash: TransactionHash,
        sender: AccountAddress,
        #[serde(deserialize_with = "u64_from_str")]
        sequence_number: u64,
        #[serde(deserialize_with = "u64_from_str")]
        version: u64,
        #[serde(deserialize_with = "u64_from_str")]
        gas_used: u64,
        success: bool,
        vm_status: String,
    },
}

impl From<NodeTransaction> for ChainTransaction {
    fn from(tx: NodeTransaction) -> Self {
        match tx {
            NodeTransaction::PendingTransaction {
                hash,
                sender,
                sequence_number,
            } => ChainTransaction {
                hash,
                sender,
                sequence_number,
                status: TransactionStatus::Pending,
                version: None,
                gas_used: None,
            },
            NodeTransaction::UserTransaction {
                hash,
                sender,
                sequence_number,
                version,
                gas_used,
                success,
                vm_status,
            } => ChainTransaction {
                hash,
                sender,
                sequence_number,
                status: if success {
                    TransactionStatus::Executed
                } else {
                    TransactionStatus::Failed { vm_status }
                },
                version: Some(version),
                gas_used: Some(gas_used),
            },
        }
    }
}

/// Node APIs render u64 as decimal strings; accept bare numbers too.
fn u64_from_str<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl RestChainClient {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| KofiError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.node_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let response = self.authorized(self.http.get(self.url(path))).send().await?;
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::node_error(response).await);
        }
        response.json::<T>().await.map_err(|e| {
            KofiError::network_connection(format!("Unexpected node response ({}): {}", status, e))
        })
    }

    async fn node_error(response: Response) -> KofiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<NodeError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        if status.is_client_error() {
            KofiError::transaction(message)
        } else {
            KofiError::network_connection(format!("Node returned {}: {}", status, message))
        }
    }
}

#[async_trait]
impl ChainClient for RestChainClient {
    async fn chain_id(&self) -> Result<u8> {
        let info: LedgerInfo = Self::read_json(self.get("").await?).await?;
        Ok(info.chain_id)
    }

    async fn sequence_number(&self, address: AccountAddress) -> Result<u64> {
        let response = self.get(&format!("/accounts/{}", address)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let account: AccountResource = Self::read_json(response).await?;
        Ok(account.sequence_number)
    }

    async fn balance(&self, address: AccountAddress, coin_type: &str) -> Result<u64> {
        #[derive(Deserialize)]
        struct Balance(#[serde(deserialize_with = "u64_from_str")] u64);

        let response = self
            .get(&format!("/accounts/{}/balance/{}", address, coin_type))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let balance: Balance = Self::read_json(response).await?;
        Ok(balance.0)
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<PendingTransaction> {
        let body = transaction.to_bytes()?;
        let request = self
            .http
            .post(self.url("/transactions"))
            .header(reqwest::header::CONTENT_TYPE, SIGNED_TRANSACTION_CONTENT_TYPE)
            .body(body);

        let response = self.authorized(request).send().await?;
        let pending: PendingTransaction = Self::read_json(response).await?;
        tracing::debug!("Node accepted transaction {}", pending.hash);
        Ok(pending)
    }

    async fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<Option<ChainTransaction>> {
        let response = self.get(&format!("/transactions/by_hash/{}", hash)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let tx: NodeTransaction = Self::read_json(response).await?;
        Ok(Some(tx.into()))
    }
}
