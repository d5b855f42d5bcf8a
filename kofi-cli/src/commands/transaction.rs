use crate::config::CliConfig;
use comfy_table::{presets::UTF8_FULL, Table};
use kofi_core::payloads;
use kofi_core::{
    format_amount, parse_amount, AccountAddress, ChainClient, ChainTransaction, ClientSigner,
    ConfirmingSigner, EntryFunction, ExplorerKind, KofiError, LocalAccount, Result,
    SigningCapability, SponsoredSender, TransactionHash, TransactionStatus, WaitConfig,
};
use std::sync::Arc;
use std::time::Duration;

/// Flags shared by every command that submits a transaction.
#[derive(Debug, Clone, clap::Args)]
pub struct SubmitOptions {
    /// Sign without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Return after the relay accepts the transaction
    #[arg(long)]
    pub no_wait: bool,
}

pub async fn handle_send(
    to: String,
    amount: String,
    options: SubmitOptions,
    config: &CliConfig,
) -> Result<()> {
    let recipient = AccountAddress::parse_recipient(&to)?;
    let units = parse_amount(&amount)?;
    if units == 0 {
        return Err(KofiError::InvalidAmount("Amount must be greater than 0".to_string()));
    }

    println!("Sending {} KOFI to {}", format_amount(units), recipient);
    submit_transfer(payloads::pay(Some(recipient), units)?, units, options, config).await
}

pub async fn handle_order(amount: String, options: SubmitOptions, config: &CliConfig) -> Result<()> {
    let units = parse_amount(&amount)?;
    if units == 0 {
        return Err(KofiError::InvalidAmount("Amount must be greater than 0".to_string()));
    }

    println!("Paying {} KOFI to the café", format_amount(units));
    submit_transfer(payloads::pay(None, units)?, units, options, config).await
}

pub async fn handle_spin(
    pot: Option<u64>,
    amount: Option<u64>,
    options: SubmitOptions,
    config: &CliConfig,
) -> Result<()> {
    println!("Spinning the wheel (pot {})", pot.unwrap_or(0));
    submit(payloads::spin(pot, amount)?, options, config).await
}

async fn submit_transfer(
    payload: EntryFunction,
    units: u64,
    options: SubmitOptions,
    config: &CliConfig,
) -> Result<()> {
    let key = config.unlock_key()?;
    let chain = config.chain()?;

    let available = chain.balance(key.address(), &config.network.coin_type).await?;
    if available < units {
        return Err(KofiError::InsufficientBalance {
            need: units,
            available,
        });
    }

    run(payload, LocalAccount::new(key), chain, options, config).await
}

async fn submit(payload: EntryFunction, options: SubmitOptions, config: &CliConfig) -> Result<()> {
    let key = config.unlock_key()?;
    let chain = config.chain()?;
    run(payload, LocalAccount::new(key), chain, options, config).await
}

async fn run(
    payload: EntryFunction,
    account: LocalAccount,
    chain: Arc<dyn ChainClient>,
    options: SubmitOptions,
    config: &CliConfig,
) -> Result<()> {
    let capability: Arc<dyn SigningCapability> = if options.yes {
        Arc::new(account)
    } else {
        Arc::new(ConfirmingSigner::new(account))
    };
    let signer = Arc::new(ClientSigner::connected(capability));
    let sender = SponsoredSender::new(chain, signer, config.relay()?);

    let hash = sender.submit(payload).await?;
    println!("Submitted: {}", hash);
    println!(
        "  Explorer: {}",
        config
            .network
            .explorer_link(ExplorerKind::Transaction, &hash.to_hex())
    );

    if options.no_wait {
        return Ok(());
    }

    let tx = sender.waiter().wait(&hash).await?;
    print_outcome(&tx)
}

pub async fn handle_status(hash: String, config: &CliConfig) -> Result<()> {
    let hash: TransactionHash = hash.parse()?;
    let chain = config.chain()?;

    match chain.transaction_by_hash(&hash).await? {
        Some(tx) => println!("{}", status_table(&tx)),
        None => println!("Transaction {} not found", hash),
    }
    Ok(())
}

pub async fn handle_wait(hash: String, timeout_secs: u64, config: &CliConfig) -> Result<()> {
    let hash: TransactionHash = hash.parse()?;
    let waiter = kofi_core::ConfirmationWaiter::new(
        config.chain()?,
        WaitConfig::default().with_timeout(Duration::from_secs(timeout_secs)),
    );

    println!("Waiting for {}...", hash);
    let tx = waiter.wait(&hash).await?;
    print_outcome(&tx)
}

fn print_outcome(tx: &ChainTransaction) -> Result<()> {
    println!("{}", status_table(tx));
    match &tx.status {
        TransactionStatus::Failed { vm_status } => Err(KofiError::transaction(format!(
            "Transaction {} failed on chain: {}",
            tx.hash, vm_status
        ))),
        _ => {
            println!("Confirmed");
            Ok(())
        }
    }
}

fn status_table(tx: &ChainTransaction) -> Table {
    let status = match &tx.status {
        TransactionStatus::Pending => "Pending".to_string(),
        TransactionStatus::Executed => "Executed".to_string(),
        TransactionStatus::Failed { vm_status } => format!("Failed ({})", vm_status),
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Hash".to_string(), tx.hash.to_hex()]);
    table.add_row(vec!["Sender".to_string(), tx.sender.to_hex()]);
    table.add_row(vec!["Sequence".to_string(), tx.sequence_number.to_string()]);
    table.add_row(vec!["Status".to_string(), status]);
    table.add_row(vec![
        "Version".to_string(),
        tx.version.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Gas used".to_string(),
        tx.gas_used.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string()),
    ]);
    table
}
