mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use kofi_core::{KofiError, Network};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kofi")]
#[command(about = "Kofi wallet - gasless transfers and the café lottery")]
#[command(version)]
struct Cli {
    /// Network (mainnet, testnet, devnet, local)
    #[arg(long, global = true, env = "NETWORK", default_value = "mainnet")]
    network: Network,

    /// Override the node REST URL
    #[arg(long, global = true, env = "NODE_URL")]
    node_url: Option<String>,

    /// Node API key
    #[arg(long, global = true, env = "APTOS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sponsor relay URL
    #[arg(long, global = true, env = "KOFI_RELAY_URL")]
    relay_url: Option<String>,

    /// Keystore file
    #[arg(long, global = true)]
    keystore: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account key management
    #[command(subcommand)]
    Key(commands::KeyCommands),

    /// Show a Kofi balance
    Balance {
        /// Address to query (defaults to the stored key)
        address: Option<String>,
    },

    /// Send Kofi to another account, gas paid by the relay
    Send {
        /// Recipient address (0x followed by 64 hex characters)
        to: String,
        /// Amount in KOFI, e.g. 1.5
        amount: String,
        #[command(flatten)]
        options: commands::SubmitOptions,
    },

    /// Pay for a café order
    Order {
        /// Amount in KOFI
        amount: String,
        #[command(flatten)]
        options: commands::SubmitOptions,
    },

    /// Spin the lottery wheel
    Spin {
        /// Pot to spin for
        #[arg(long)]
        pot: Option<u64>,
        /// Number of spins
        #[arg(long)]
        amount: Option<u64>,
        #[command(flatten)]
        options: commands::SubmitOptions,
    },

    /// Show a transaction's on-chain status
    Status {
        /// Transaction hash
        hash: String,
    },

    /// Wait for a transaction to finish
    Wait {
        /// Transaction hash
        hash: String,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "kofi={},kofi_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::new(
        cli.network,
        cli.node_url,
        cli.api_key,
        cli.relay_url,
        cli.keystore,
    )?;

    let result = match cli.command {
        Commands::Key(cmd) => commands::handle_key_command(cmd, &config).await,
        Commands::Balance { address } => commands::handle_balance_command(address, &config).await,
        Commands::Send {
            to,
            amount,
            options,
        } => commands::handle_send(to, amount, options, &config).await,
        Commands::Order { amount, options } => {
            commands::handle_order(amount, options, &config).await
        }
        Commands::Spin {
            pot,
            amount,
            options,
        } => commands::handle_spin(pot, amount, options, &config).await,
        Commands::Status { hash } => commands::handle_status(hash, &config).await,
        Commands::Wait { hash, timeout_secs } => {
            commands::handle_wait(hash, timeout_secs, &config).await
        }
    };

    if let Err(e) = result {
        match e {
            KofiError::UserRejected => {
                eprintln!("Cancelled: nothing was signed or sent");
                return Ok(());
            }
            KofiError::SigningUnavailable(msg) => {
                eprintln!("Error: Signing unavailable: {}", msg);
                eprintln!("Check the keystore with 'kofi key show' and reconnect the wallet");
            }
            KofiError::TimedOut { hash } => {
                eprintln!("Error: Timed out waiting for {}", hash);
                eprintln!(
                    "The transaction may still land; re-query with 'kofi status {}' instead of resending",
                    hash
                );
            }
            KofiError::InsufficientBalance { need, available } => {
                eprintln!("Error: Insufficient balance");
                eprintln!(
                    "Need: {} KOFI, Available: {} KOFI",
                    kofi_core::format_amount(need),
                    kofi_core::format_amount(available)
                );
            }
            KofiError::NotFeePayer(msg) => {
                eprintln!("Error: Relay refused to sponsor: {}", msg);
                eprintln!("Check --relay-url points at the relay for this network");
            }
            KofiError::NetworkConnection(msg) => {
                eprintln!("Error: Network connection error: {}", msg);
                eprintln!("A submission may have gone through; check 'kofi balance' before resending");
            }
            KofiError::InvalidAddress(addr) => {
                eprintln!("Error: Invalid address: {}", addr);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
