use crate::error::{KofiError, Result};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const ENCRYPTION_METHOD: &str = "ChaCha20Poly1305";

const SALT_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const PBKDF2_ROUNDS: u32 = 100_000;

/// Ciphertext plus what is needed to open it again with the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub checksum: String,
}

pub fn seal(data: &[u8], password: &str) -> Result<Sealed> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt);
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let cipher = ChaCha20Poly1305::new(&key);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| KofiError::keystore(format!("Encryption failed: {}", e)))?;

    Ok(Sealed {
        salt: salt.to_vec(),
        nonce: nonce.to_vec(),
        checksum: checksum(&ciphertext),
        ciphertext,
    })
}

pub fn open(sealed: &Sealed, password: &str) -> Result<Vec<u8>> {
    if checksum(&sealed.ciphertext) != sealed.checksum {
        return Err(KofiError::keystore("Keystore checksum verification failed"));
    }
    if sealed.nonce.len() != NONCE_SIZE {
        return Err(KofiError::keystore("Keystore nonce has the wrong length"));
    }

    let key = derive_key(password, &sealed.salt);
    let cipher = ChaCha20Poly1305::new(&key);
    let nonce = Nonce::from_slice(&sealed.nonce);

    cipher
        .decrypt(nonce, sealed.ciphertext.as_ref())
        .map_err(|_| KofiError::keystore("Decryption failed: wrong password or corrupted keystore"))
}

fn derive_key(password: &str, salt: &[u8]) -> Key {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    *Key::from_slice(&key)
}

fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let sealed = seal(b"kofi secret", "hunter2").unwrap();
        assert_eq!(open(&sealed, "hunter2").unwrap(), b"kofi secret");
    }

    #[test]
    fn test_wrong_password() {
        let sealed = seal(b"kofi secret", "hunter2").unwrap();
        assert!(matches!(open(&sealed, "hunter3"), Err(KofiError::Keystore(_))));
    }

    #[test]
    fn test_corrupted_ciphertext() {
        let mut sealed = seal(b"kofi secret", "hunter2").unwrap();
        sealed.ciphertext[0] ^= 0xff;
        assert!(matches!(open(&sealed, "hunter2"), Err(KofiError::Keystore(_))));
    }
}
