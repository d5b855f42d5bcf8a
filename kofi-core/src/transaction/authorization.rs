use crate::types::AccountAddress;
use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};

const ED25519_SCHEME: u8 = 0x00;

/// Derive the account address controlled by an Ed25519 public key.
pub fn derive_address(public_key: &[u8; 32]) -> AccountAddress {
    let mut hasher = Sha256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    AccountAddress::new(hasher.finalize().into())
}

/// An Ed25519 signature together with the public key that produced it.
#[derive(Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Authorization {
    public_key: [u8; 32],
    signature: [u8; 64],
}

impl Authorization {
    pub fn new(public_key: [u8; 32], signature: [u8; 64]) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    pub fn signer_address(&self) -> AccountAddress {
        derive_address(&self.public_key)
    }

    pub fn verify(&self, message: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.public_key) else {
            return false;
        };
        let signature = Signature::from_bytes(&self.signature);
        key.verify_strict(message, &signature).is_ok()
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("public_key", &hex::encode(self.public_key))
            .field("signature", &hex::encode(&self.signature[..8]))
            .finish()
    }
}

/// The sender's approval of one exact transaction.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SenderAuthorization(Authorization);

impl SenderAuthorization {
    pub fn new(authorization: Authorization) -> Self {
        Self(authorization)
    }

    pub fn inner(&self) -> &Authorization {
        &self.0
    }
}

/// The sponsor's approval to pay gas for one exact transaction.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FeePayerAuthorization(Authorization);

impl FeePayerAuthorization {
    pub fn new(authorization: Authorization) -> Self {
        Self(authorization)
    }

    pub fn inner(&self) -> &Authorization {
        &self.0
    }
}
