use crate::error::{KofiError, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_LENGTH: usize = 32;

/// A 32-byte on-chain account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a user-entered recipient. Only the full `0x` + 64 hex digit form is
    /// accepted here; short special addresses like `0x1` are not valid recipients.
    pub fn parse_recipient(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .ok_or_else(|| KofiError::InvalidAddress(format!("{} (missing 0x prefix)", trimmed)))?;

        if digits.len() != ADDRESS_LENGTH * 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KofiError::InvalidAddress(format!(
                "{} (expected 0x followed by 64 hex characters)",
                trimmed
            )));
        }

        trimmed.parse()
    }
}

impl FromStr for AccountAddress {
    type Err = KofiError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(KofiError::InvalidAddress(s.to_string()));
        }

        // short forms such as 0x1 are left-padded
        let padded = format!("{:0>64}", digits);
        let bytes = hex::decode(&padded).map_err(|_| KofiError::InvalidAddress(s.to_string()))?;

        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Chain-assigned transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash([u8; 32]);

impl TransactionHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for TransactionHash {
    type Err = KofiError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = hex::decode(digits)
            .map_err(|e| KofiError::invalid_operation(format!("Invalid transaction hash {}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            KofiError::invalid_operation(format!("Invalid transaction hash {}: expected 32 bytes", s))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionHash({})", self.to_hex())
    }
}

impl Serialize for TransactionHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TransactionHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Executed,
    Failed { vm_status: String },
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// A transaction as observed on chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub hash: TransactionHash,
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub status: TransactionStatus,
    pub version: Option<u64>,
    pub gas_used: Option<u64>,
}

/// Acknowledgement returned by the chain when a transaction enters its mempool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: TransactionHash,
}

/// Outcome of a successful relay submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub hash: TransactionHash,
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub fee_payer: AccountAddress,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address_is_padded() {
        let addr: AccountAddress = "0x1".parse().unwrap();
        assert_eq!(
            addr.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_recipient_validation_is_strict() {
        let full = "0x15fc9d4db533357da61c4e30341256c11636495f505cc2a48291ddbe0da83694";
        assert_eq!(AccountAddress::parse_recipient(full).unwrap().to_hex(), full);

        assert!(AccountAddress::parse_recipient("0x1").is_err());
        assert!(AccountAddress::parse_recipient(&full[2..]).is_err());
        assert!(AccountAddress::parse_recipient(
            "0x15fc9d4db533357da61c4e30341256c11636495f505cc2a48291ddbe0da8369z"
        )
        .is_err());
    }

    #[test]
    fn test_address_rejects_overlong_input() {
        let too_long = format!("0x{}", "a".repeat(65));
        assert!(too_long.parse::<AccountAddress>().is_err());
    }

    #[test]
    fn test_hash_json_form() {
        let hash = TransactionHash::new([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
        let back: TransactionHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
