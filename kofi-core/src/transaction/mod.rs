//! Transaction data model.
//!
//! Every value here is immutable once built: a new stage of the sponsored
//! pipeline always produces a new value from the previous one.

pub mod abi;
pub mod authorization;
pub mod builder;
pub mod payloads;

pub use abi::{AbiRegistry, EntryFunctionAbi};
pub use authorization::{Authorization, FeePayerAuthorization, SenderAuthorization};
pub use builder::{BuildOptions, TransactionBuilder};

use crate::error::{KofiError, Result};
use crate::types::{AccountAddress, TransactionHash};
use borsh::{io, BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const RAW_TRANSACTION_SALT: &[u8] = b"KOFI::RawTransactionWithData";
const TRANSACTION_SALT: &[u8] = b"KOFI::Transaction";

/// Fully qualified entry function, e.g. `0x1::aptos_account::transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct FunctionId {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
}

impl FunctionId {
    pub fn new(address: AccountAddress, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address,
            module: module.into(),
            name: name.into(),
        }
    }
}

impl FromStr for FunctionId {
    type Err = KofiError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        if parts.len() != 3 || !is_identifier(parts[1]) || !is_identifier(parts[2]) {
            return Err(KofiError::invalid_operation(format!(
                "Invalid function id: {} (expected <address>::<module>::<function>)",
                s
            )));
        }

        let address = parts[0]
            .parse()
            .map_err(|_| KofiError::invalid_operation(format!("Invalid module address in {}", s)))?;
        Ok(Self::new(address, parts[1], parts[2]))
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", short_hex(&self.address), self.module, self.name)
    }
}

fn short_hex(address: &AccountAddress) -> String {
    let full = hex::encode(address.as_bytes());
    let trimmed = full.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    Address,
    String,
    Vector(Box<MoveType>),
}

impl FromStr for MoveType {
    type Err = KofiError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let ty = match s {
            "bool" => MoveType::Bool,
            "u8" => MoveType::U8,
            "u16" => MoveType::U16,
            "u32" => MoveType::U32,
            "u64" => MoveType::U64,
            "u128" => MoveType::U128,
            "address" => MoveType::Address,
            "0x1::string::String" => MoveType::String,
            _ => {
                let inner = s
                    .strip_prefix("vector<")
                    .and_then(|rest| rest.strip_suffix('>'))
                    .ok_or_else(|| KofiError::invalid_operation(format!("Unsupported Move type: {}", s)))?;
                MoveType::Vector(Box::new(inner.parse()?))
            }
        };
        Ok(ty)
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveType::Bool => f.write_str("bool"),
            MoveType::U8 => f.write_str("u8"),
            MoveType::U16 => f.write_str("u16"),
            MoveType::U32 => f.write_str("u32"),
            MoveType::U64 => f.write_str("u64"),
            MoveType::U128 => f.write_str("u128"),
            MoveType::Address => f.write_str("address"),
            MoveType::String => f.write_str("0x1::string::String"),
            MoveType::Vector(inner) => write!(f, "vector<{}>", inner),
        }
    }
}

/// Deepest `vector<...>` nesting accepted when decoding arguments.
pub const MAX_VECTOR_DEPTH: usize = 8;

/// A typed entry function argument.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, Serialize, Deserialize)]
pub enum MoveValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Address(AccountAddress),
    String(String),
    Vector(Vec<MoveValue>),
}

impl MoveValue {
    /// Whether this value inhabits `ty`.
    pub fn matches(&self, ty: &MoveType) -> bool {
        match (self, ty) {
            (MoveValue::Bool(_), MoveType::Bool)
            | (MoveValue::U8(_), MoveType::U8)
            | (MoveValue::U16(_), MoveType::U16)
            | (MoveValue::U32(_), MoveType::U32)
            | (MoveValue::U64(_), MoveType::U64)
            | (MoveValue::U128(_), MoveType::U128)
            | (MoveValue::Address(_), MoveType::Address)
            | (MoveValue::String(_), MoveType::String) => true,
            (MoveValue::Vector(items), MoveType::Vector(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            _ => false,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MoveValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<AccountAddress> {
        match self {
            MoveValue::Address(a) => Some(*a),
            _ => None,
        }
    }
}

// Variant tags follow declaration order, as the derived serializer writes them.
impl BorshDeserialize for MoveValue {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        Self::read_nested(reader, 0)
    }
}

impl MoveValue {
    fn read_nested<R: io::Read>(reader: &mut R, depth: usize) -> io::Result<Self> {
        let value = match u8::deserialize_reader(reader)? {
            0 => MoveValue::Bool(bool::deserialize_reader(reader)?),
            1 => MoveValue::U8(u8::deserialize_reader(reader)?),
            2 => MoveValue::U16(u16::deserialize_reader(reader)?),
            3 => MoveValue::U32(u32::deserialize_reader(reader)?),
            4 => MoveValue::U64(u64::deserialize_reader(reader)?),
            5 => MoveValue::U128(u128::deserialize_reader(reader)?),
            6 => MoveValue::Address(AccountAddress::deserialize_reader(reader)?),
            7 => MoveValue::String(String::deserialize_reader(reader)?),
            8 => {
                if depth >= MAX_VECTOR_DEPTH {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Vector arguments nested deeper than {}", MAX_VECTOR_DEPTH),
                    ));
                }
                let len = u32::deserialize_reader(reader)? as usize;
                // length is untrusted until the items are actually read
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Self::read_nested(reader, depth + 1)?);
                }
                MoveValue::Vector(items)
            }
            tag => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Unknown argument tag {}", tag),
                ))
            }
        };
        Ok(value)
    }
}

/// The operation a transaction performs.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct EntryFunction {
    pub function: FunctionId,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<MoveValue>,
}

impl EntryFunction {
    pub fn new(function: FunctionId, type_arguments: Vec<String>, arguments: Vec<MoveValue>) -> Self {
        Self {
            function,
            type_arguments,
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: EntryFunction,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

/// A built transaction awaiting authorization.
///
/// The fee-payer slot is either absent (the sender pays gas) or reserved for
/// one specific sponsor address. Fields are private so the bytes a signature
/// covers cannot be altered after signing.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UnsignedTransaction {
    raw: RawTransaction,
    fee_payer: Option<AccountAddress>,
}

impl UnsignedTransaction {
    pub fn new(raw: RawTransaction, fee_payer: Option<AccountAddress>) -> Self {
        Self { raw, fee_payer }
    }

    pub fn raw(&self) -> &RawTransaction {
        &self.raw
    }

    pub fn sender(&self) -> AccountAddress {
        self.raw.sender
    }

    pub fn sequence_number(&self) -> u64 {
        self.raw.sequence_number
    }

    pub fn payload(&self) -> &EntryFunction {
        &self.raw.payload
    }

    pub fn fee_payer(&self) -> Option<AccountAddress> {
        self.fee_payer
    }

    pub fn has_fee_payer_slot(&self) -> bool {
        self.fee_payer.is_some()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| KofiError::internal(format!("Failed to serialize transaction: {}", e)))
    }

    /// The exact bytes both the sender and the fee payer sign.
    pub fn signing_message(&self) -> Result<Vec<u8>> {
        let mut message = Sha256::digest(RAW_TRANSACTION_SALT).to_vec();
        message.extend(self.to_bytes()?);
        Ok(message)
    }
}

/// A transaction carrying every authorization the chain needs.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    transaction: UnsignedTransaction,
    sender: SenderAuthorization,
    fee_payer: Option<FeePayerAuthorization>,
}

impl SignedTransaction {
    /// A self-paid transaction.
    pub fn new(transaction: UnsignedTransaction, sender: SenderAuthorization) -> Self {
        Self {
            transaction,
            sender,
            fee_payer: None,
        }
    }

    /// A sponsored transaction. At most one fee-payer authorization can be attached.
    pub fn with_fee_payer(
        transaction: UnsignedTransaction,
        sender: SenderAuthorization,
        fee_payer: FeePayerAuthorization,
    ) -> Self {
        Self {
            transaction,
            sender,
            fee_payer: Some(fee_payer),
        }
    }

    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.transaction
    }

    pub fn sender_authorization(&self) -> &SenderAuthorization {
        &self.sender
    }

    pub fn fee_payer_authorization(&self) -> Option<&FeePayerAuthorization> {
        self.fee_payer.as_ref()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| KofiError::internal(format!("Failed to serialize signed transaction: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes)
            .map_err(|e| KofiError::transaction(format!("Invalid signed transaction bytes: {}", e)))
    }

    pub fn hash(&self) -> Result<TransactionHash> {
        let mut hasher = Sha256::new();
        hasher.update(Sha256::digest(TRANSACTION_SALT));
        hasher.update(self.to_bytes()?);
        Ok(TransactionHash::new(hasher.finalize().into()))
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub fn transfer_payload(to: AccountAddress, amount: u64) -> EntryFunction {
        EntryFunction::new(
            "0x1::aptos_account::transfer".parse().unwrap(),
            vec![],
            vec![MoveValue::Address(to), MoveValue::U64(amount)],
        )
    }

    pub fn raw_transaction(sender: AccountAddress, sequence_number: u64) -> RawTransaction {
        RawTransaction {
            sender,
            sequence_number,
            payload: transfer_payload(AccountAddress::new([7u8; 32]), 100),
            max_gas_amount: 2_000,
            gas_unit_price: 100,
            expiration_timestamp_secs: u64::MAX / 2,
            chain_id: 4,
        }
    }
}
