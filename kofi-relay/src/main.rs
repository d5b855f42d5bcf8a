use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kofi_core::{
    format_amount, parse_amount, ChainClient, InMemoryChain, RestChainClient, SponsorRelay,
};
use kofi_relay::{build_router, RelayConfig, RelayContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Chain id the in-memory dev chain reports.
const DEV_CHAIN_ID: u8 = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::parse();

    // Initialize logging
    let log_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "kofi_relay={},kofi_core={}",
                    log_level, log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let sponsor = config.sponsor_key().context("Invalid sponsor configuration")?;

    let chain: Arc<dyn ChainClient> = if config.dev {
        let chain = InMemoryChain::new(DEV_CHAIN_ID);
        chain.fund(sponsor.address(), parse_amount("1000000")?);
        for address in &config.dev_fund {
            let amount = parse_amount("1000")?;
            chain.fund(*address, amount);
            tracing::info!("Dev mode: funded {} with {} KOFI", address, format_amount(amount));
        }
        tracing::warn!("Dev mode: relaying to an in-memory chain, nothing reaches a real network");
        Arc::new(chain)
    } else {
        let network = config.network_config()?;
        tracing::info!("Relaying to {} via {}", network.network, network.node_url);
        Arc::new(RestChainClient::new(&network)?)
    };

    let relay = SponsorRelay::new(chain, sponsor);
    let ctx = Arc::new(RelayContext::new(relay, config.network));
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!("Kofi relay listening on {}", config.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
