use crate::error::{KofiError, Result};
use crate::signer::SigningCapability;
use crate::transaction::authorization::derive_address;
use crate::transaction::{Authorization, FeePayerAuthorization, SenderAuthorization, UnsignedTransaction};
use crate::types::AccountAddress;
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

/// Prefix some wallets put in front of exported private keys.
const PRIVATE_KEY_PREFIX: &str = "ed25519-priv-";

/// An Ed25519 account key. `Debug` never prints the secret.
#[derive(Clone)]
pub struct AccountKey {
    signing_key: SigningKey,
}

impl AccountKey {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Parse a hex private key, with or without `0x` and the `ed25519-priv-` prefix.
    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix(PRIVATE_KEY_PREFIX).unwrap_or(trimmed);
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|_| KofiError::config("Private key is not valid hex"))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KofiError::config("Private key must be 32 bytes"))?;

        Ok(Self::from_bytes(&secret))
    }

    pub(crate) fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> AccountAddress {
        derive_address(&self.public_key())
    }

    pub fn sign_message(&self, message: &[u8]) -> Authorization {
        let signature = self.signing_key.sign(message);
        Authorization::new(self.public_key(), signature.to_bytes())
    }

    pub fn sign_as_sender(&self, transaction: &UnsignedTransaction) -> Result<SenderAuthorization> {
        Ok(SenderAuthorization::new(
            self.sign_message(&transaction.signing_message()?),
        ))
    }

    pub fn sign_as_fee_payer(&self, transaction: &UnsignedTransaction) -> Result<FeePayerAuthorization> {
        Ok(FeePayerAuthorization::new(
            self.sign_message(&transaction.signing_message()?),
        ))
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey")
            .field("address", &self.address())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A signing capability backed by a key held in this process.
#[derive(Debug, Clone)]
pub struct LocalAccount {
    key: AccountKey,
}

impl LocalAccount {
    pub fn new(key: AccountKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl SigningCapability for LocalAccount {
    fn address(&self) -> AccountAddress {
        self.key.address()
    }

    async fn authorize(&self, transaction: &UnsignedTransaction) -> Result<SenderAuthorization> {
        if transaction.sender() != self.key.address() {
            return Err(KofiError::signing_unavailable(format!(
                "Account {} cannot sign for sender {}",
                self.key.address(),
                transaction.sender()
            )));
        }
        self.key.sign_as_sender(transaction)
    }
}
