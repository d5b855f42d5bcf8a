use crate::config::{read_password, CliConfig};
use clap::Subcommand;
use kofi_core::{AccountKey, ExplorerKind, KofiError, Keystore, Result};

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate a new account key and store it encrypted
    New {
        /// Overwrite an existing keystore
        #[arg(long)]
        force: bool,

        /// Import this private key (hex) instead of generating one
        #[arg(long)]
        import: Option<String>,
    },
    /// Show the address of the stored key
    Show,
}

pub async fn handle_key_command(cmd: KeyCommands, config: &CliConfig) -> Result<()> {
    match cmd {
        KeyCommands::New { force, import } => {
            let path = &config.keystore_path;
            if path.exists() && !force {
                return Err(KofiError::keystore(format!(
                    "Keystore already exists at {} (use --force to overwrite)",
                    path.display()
                )));
            }

            let key = match import {
                Some(hex) => AccountKey::from_hex(&hex)?,
                None => AccountKey::generate(),
            };
            let password = read_password("New keystore password", true)?;
            Keystore::encrypt(&key, &password)?.save(path)?;

            println!("Account created");
            println!("  Address: {}", key.address());
            println!("  Keystore: {}", path.display());
            println!(
                "  Explorer: {}",
                config
                    .network
                    .explorer_link(ExplorerKind::Account, &key.address().to_hex())
            );
        }

        KeyCommands::Show => {
            let keystore = Keystore::load(&config.keystore_path)?;
            println!("Address: {}", keystore.address);
            println!("Created: {}", keystore.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("Keystore: {}", config.keystore_path.display());
        }
    }

    Ok(())
}
