//! The blockchain seen through the handful of calls the wallet and relay need.

pub mod memory;
pub mod rest;

pub use memory::InMemoryChain;
pub use rest::RestChainClient;

use crate::error::Result;
use crate::transaction::SignedTransaction;
use crate::types::{AccountAddress, ChainTransaction, PendingTransaction, TransactionHash};
use async_trait::async_trait;

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u8>;

    /// Next sequence number the chain will accept from `address`.
    async fn sequence_number(&self, address: AccountAddress) -> Result<u64>;

    async fn balance(&self, address: AccountAddress, coin_type: &str) -> Result<u64>;

    /// Hand a fully authorized transaction to the chain.
    ///
    /// Rejections (bad signature, sequence conflict, failed simulation) come
    /// back as `KofiError::TransactionError` carrying the chain's message.
    async fn submit(&self, transaction: &SignedTransaction) -> Result<PendingTransaction>;

    /// `None` when the chain does not know the hash (yet).
    async fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<Option<ChainTransaction>>;
}
