//! Transport envelope: what the client posts to the relay.
//!
//! Layout before base64: `[version] || borsh(UnsignedTransaction) || borsh(SenderAuthorization)`.

use crate::error::{KofiError, Result};
use crate::transaction::{SenderAuthorization, UnsignedTransaction};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use borsh::{BorshDeserialize, BorshSerialize};

pub const ENVELOPE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
struct EnvelopeBody {
    transaction: UnsignedTransaction,
    sender: SenderAuthorization,
}

/// Base64 text safe to put in a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEnvelope(String);

impl TransportEnvelope {
    pub fn encode(transaction: &UnsignedTransaction, sender: &SenderAuthorization) -> Result<Self> {
        let mut bytes = vec![ENVELOPE_VERSION];
        transaction
            .serialize(&mut bytes)
            .and_then(|_| sender.serialize(&mut bytes))
            .map_err(|e| KofiError::internal(format!("Failed to encode envelope: {}", e)))?;
        Ok(Self(STANDARD.encode(bytes)))
    }

    pub fn decode(&self) -> Result<(UnsignedTransaction, SenderAuthorization)> {
        let text = self.0.trim();
        if text.is_empty() {
            return Err(KofiError::malformed_envelope("Envelope is empty"));
        }

        let bytes = STANDARD
            .decode(text)
            .map_err(|e| KofiError::malformed_envelope(format!("Invalid base64: {}", e)))?;

        let (version, body) = bytes
            .split_first()
            .ok_or_else(|| KofiError::malformed_envelope("Envelope is empty"))?;
        if *version != ENVELOPE_VERSION {
            return Err(KofiError::malformed_envelope(format!(
                "Unsupported envelope version {}",
                version
            )));
        }

        // from_slice also rejects trailing bytes
        let body: EnvelopeBody = borsh::from_slice(body)
            .map_err(|e| KofiError::malformed_envelope(format!("Corrupt envelope: {}", e)))?;

        Ok((body.transaction, body.sender))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for TransportEnvelope {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TransportEnvelope {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
