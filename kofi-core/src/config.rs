use crate::error::{KofiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const EXPLORER_URL: &str = "https://explorer.aptoslabs.com";

/// Coin type of the Kofi token used for transfers and balance lookups.
pub const KOFI_COIN_TYPE: &str =
    "0x2acee43658eedf3d0197e5a1fefff6b8971577ff5f04324c0e97c9520e8509a7::coin_factory::Emojicoin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Local => "local",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = KofiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            _ => Err(KofiError::config(format!(
                "Invalid network: {}. Supported networks: mainnet, testnet, devnet, local",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerKind {
    Transaction,
    Account,
    Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Network,
    pub node_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub coin_type: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            node_url: "https://api.mainnet.aptoslabs.com".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(5),
            coin_type: KOFI_COIN_TYPE.to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn new(network: Network) -> Self {
        let mut config = Self::default();
        config.network = network;

        config.node_url = match network {
            Network::Mainnet => "https://api.mainnet.aptoslabs.com".to_string(),
            Network::Testnet => "https://api.testnet.aptoslabs.com".to_string(),
            Network::Devnet => "https://api.devnet.aptoslabs.com".to_string(),
            Network::Local => "http://127.0.0.1:8080".to_string(),
        };

        config
    }

    pub fn with_node_url(mut self, node_url: impl Into<String>) -> Self {
        self.node_url = node_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_url.is_empty() {
            return Err(KofiError::config("Node URL cannot be empty"));
        }

        if !self.node_url.starts_with("http://") && !self.node_url.starts_with("https://") {
            return Err(KofiError::config(format!(
                "Node URL must be http(s): {}",
                self.node_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(KofiError::config("Request timeout must be greater than 0"));
        }

        if self.coin_type.split("::").count() != 3 {
            return Err(KofiError::config(format!("Invalid coin type: {}", self.coin_type)));
        }

        Ok(())
    }

    /// Link to a transaction, account or object in the public explorer.
    pub fn explorer_link(&self, kind: ExplorerKind, id: &str) -> String {
        let path = match kind {
            ExplorerKind::Transaction => "txn",
            ExplorerKind::Account => "account",
            ExplorerKind::Object => "object",
        };

        match self.network {
            Network::Mainnet => format!("{}/{}/{}", EXPLORER_URL, path, id),
            other => format!("{}/{}/{}?network={}", EXPLORER_URL, path, id, other),
        }
    }
}
