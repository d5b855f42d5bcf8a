use crate::config::CliConfig;
use kofi_core::{format_amount, AccountAddress, ChainClient, Keystore, Result};

/// Show the Kofi balance of `address`, or of the stored key.
pub async fn handle_balance_command(address: Option<String>, config: &CliConfig) -> Result<()> {
    let address = match address {
        Some(input) => AccountAddress::parse_recipient(&input)?,
        None => Keystore::load(&config.keystore_path)?.address,
    };

    let chain = config.chain()?;
    let balance = chain.balance(address, &config.network.coin_type).await?;

    println!("Balance for {}:", address);
    println!("  {} KOFI ({} units)", format_amount(balance), balance);
    Ok(())
}
