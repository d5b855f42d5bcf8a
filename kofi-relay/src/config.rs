use clap::Parser;
use kofi_core::{AccountAddress, AccountKey, KofiError, Network, NetworkConfig};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "kofi-relay")]
#[command(about = "Sponsored transaction relay for the Kofi token")]
#[command(version)]
pub struct RelayConfig {
    /// Network to relay to (mainnet, testnet, devnet, local)
    #[arg(long, env = "NETWORK", default_value = "mainnet")]
    pub network: Network,

    /// Override the node REST URL for the network
    #[arg(long, env = "NODE_URL")]
    pub node_url: Option<String>,

    /// API key sent to the node as a bearer token
    #[arg(long, env = "APTOS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Fee payer private key (hex, optionally prefixed with `ed25519-priv-`)
    #[arg(long, env = "SPONSOR_PRIVATE_KEY", hide_env_values = true)]
    pub sponsor_private_key: Option<String>,

    /// Address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Per-request timeout for node calls, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub request_timeout_ms: u64,

    /// Run against an in-memory chain with a funded sponsor
    #[arg(long)]
    pub dev: bool,

    /// Addresses to fund with 1000 KOFI in dev mode
    #[arg(long = "dev-fund", requires = "dev")]
    pub dev_fund: Vec<AccountAddress>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RelayConfig {
    pub fn network_config(&self) -> kofi_core::Result<NetworkConfig> {
        let mut config = NetworkConfig::new(self.network).with_api_key(self.api_key.clone());
        if let Some(url) = &self.node_url {
            config = config.with_node_url(url.clone());
        }
        config.request_timeout = Duration::from_millis(self.request_timeout_ms);
        config.validate()?;
        Ok(config)
    }

    /// The fee payer key. Dev mode makes one up when none is configured.
    pub fn sponsor_key(&self) -> kofi_core::Result<AccountKey> {
        match (&self.sponsor_private_key, self.dev) {
            (Some(hex), _) => AccountKey::from_hex(hex),
            (None, true) => Ok(AccountKey::generate()),
            (None, false) => Err(KofiError::config(
                "SPONSOR_PRIVATE_KEY is not set; the relay needs a fee payer key",
            )),
        }
    }
}
