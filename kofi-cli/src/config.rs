use kofi_core::{
    AccountKey, ChainClient, KofiError, Keystore, Network, NetworkConfig, RelayClient, Result,
    RestChainClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Read instead of prompting when set.
pub const PASSWORD_ENV: &str = "KOFI_KEYSTORE_PASSWORD";

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub network: NetworkConfig,
    pub relay_url: String,
    pub keystore_path: PathBuf,
}

impl CliConfig {
    pub fn new(
        network: Network,
        node_url: Option<String>,
        api_key: Option<String>,
        relay_url: Option<String>,
        keystore_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut network = NetworkConfig::new(network).with_api_key(api_key);
        if let Some(url) = node_url {
            network = network.with_node_url(url);
        }
        network.validate()?;

        let config = Self {
            network,
            relay_url: relay_url.unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            keystore_path: keystore_path.unwrap_or_else(default_keystore_path),
        };
        tracing::debug!(
            "Using node {} and relay {}",
            config.network.node_url,
            config.relay_url
        );
        Ok(config)
    }

    pub fn chain(&self) -> Result<Arc<dyn ChainClient>> {
        Ok(Arc::new(RestChainClient::new(&self.network)?))
    }

    pub fn relay(&self) -> Result<Arc<RelayClient>> {
        Ok(Arc::new(RelayClient::new(
            &self.relay_url,
            Duration::from_secs(30),
        )?))
    }

    pub fn unlock_key(&self) -> Result<AccountKey> {
        let keystore = Keystore::load(&self.keystore_path)?;
        tracing::debug!("Unlocking keystore {}", self.keystore_path.display());
        let password = read_password(&format!("Password for {}", keystore.address), false)?;
        keystore.decrypt(&password)
    }
}

fn default_keystore_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kofi")
        .join("keystore.json")
}

pub fn read_password(prompt: &str, confirm: bool) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Repeat password", "Passwords do not match");
    }
    input
        .interact()
        .map_err(|e| KofiError::keystore(format!("Could not read password: {}", e)))
}
