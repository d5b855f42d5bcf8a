//! Password-protected key file for the sender's account.

pub mod encryption;

use crate::error::{KofiError, Result};
use crate::signer::AccountKey;
use crate::types::AccountAddress;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const KEYSTORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keystore {
    pub version: u32,
    pub address: AccountAddress,
    pub encryption_method: String,
    pub salt: String,
    pub nonce: String,
    pub encrypted_key: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl Keystore {
    pub fn encrypt(key: &AccountKey, password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(KofiError::keystore("Password cannot be empty"));
        }

        let sealed = encryption::seal(&key.secret_bytes(), password)?;
        Ok(Self {
            version: KEYSTORE_VERSION,
            address: key.address(),
            encryption_method: encryption::ENCRYPTION_METHOD.to_string(),
            salt: general_purpose::STANDARD.encode(&sealed.salt),
            nonce: general_purpose::STANDARD.encode(&sealed.nonce),
            encrypted_key: general_purpose::STANDARD.encode(&sealed.ciphertext),
            checksum: sealed.checksum,
            created_at: Utc::now(),
        })
    }

    pub fn decrypt(&self, password: &str) -> Result<AccountKey> {
        if self.version != KEYSTORE_VERSION {
            return Err(KofiError::keystore(format!(
                "Unsupported keystore version {}",
                self.version
            )));
        }
        if self.encryption_method != encryption::ENCRYPTION_METHOD {
            return Err(KofiError::keystore(format!(
                "Unsupported encryption method {}",
                self.encryption_method
            )));
        }

        let sealed = encryption::Sealed {
            salt: decode_field("salt", &self.salt)?,
            nonce: decode_field("nonce", &self.nonce)?,
            ciphertext: decode_field("encrypted_key", &self.encrypted_key)?,
            checksum: self.checksum.clone(),
        };

        let secret: [u8; 32] = encryption::open(&sealed, password)?
            .try_into()
            .map_err(|_| KofiError::keystore("Decrypted key has the wrong length"))?;
        let key = AccountKey::from_bytes(&secret);

        if key.address() != self.address {
            return Err(KofiError::keystore(format!(
                "Keystore key does not match address {}",
                self.address
            )));
        }
        Ok(key)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(KofiError::keystore(format!(
                "No keystore at {} (run `kofi key new`)",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("Keystore for {} written to {}", self.address, path.display());
        Ok(())
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|e| KofiError::keystore(format!("Corrupted keystore field {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_decrypt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("keystore.json");
        let key = AccountKey::generate();

        Keystore::encrypt(&key, "correct horse").unwrap().save(&path).unwrap();
        let loaded = Keystore::load(&path).unwrap();

        assert_eq!(loaded.address, key.address());
        assert_eq!(loaded.decrypt("correct horse").unwrap().address(), key.address());
        assert!(matches!(loaded.decrypt("battery staple"), Err(KofiError::Keystore(_))));
    }

    #[test]
    fn test_tampered_file() {
        let key = AccountKey::generate();
        let mut keystore = Keystore::encrypt(&key, "pw").unwrap();
        keystore.address = AccountAddress::new([1u8; 32]);
        assert!(matches!(keystore.decrypt("pw"), Err(KofiError::Keystore(_))));

        let mut keystore = Keystore::encrypt(&key, "pw").unwrap();
        keystore.encrypted_key = "!!!".to_string();
        assert!(matches!(keystore.decrypt("pw"), Err(KofiError::Keystore(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Keystore::load(&dir.path().join("absent.json")),
            Err(KofiError::Keystore(_))
        ));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(Keystore::encrypt(&AccountKey::generate(), "").is_err());
    }
}
