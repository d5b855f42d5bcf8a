//! Kofi SDK - sponsored (fee-payer) transactions for the Kofi token
//!
//! The client builds and signs a transaction that reserves a fee-payer slot,
//! a relay co-signs as that fee payer and submits it, and the client waits for
//! the chain to execute it.

pub mod amount;
pub mod api;
pub mod chain;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keystore;
pub mod relay;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod waiter;

pub use amount::{format_amount, parse_amount, KOFI_DECIMALS};
pub use chain::{ChainClient, InMemoryChain, RestChainClient};
pub use client::{RebuildPolicy, Relay, RelayClient, SponsoredSender};
pub use config::{ExplorerKind, Network, NetworkConfig, KOFI_COIN_TYPE};
pub use envelope::TransportEnvelope;
pub use error::{KofiError, Result};
pub use keystore::Keystore;
pub use relay::SponsorRelay;
pub use signer::{AccountKey, ClientSigner, ConfirmingSigner, LocalAccount, SigningCapability};
pub use transaction::{
    payloads, EntryFunction, FeePayerAuthorization, SenderAuthorization, SignedTransaction,
    TransactionBuilder, UnsignedTransaction,
};
pub use types::{
    AccountAddress, ChainTransaction, SubmissionResult, TransactionHash, TransactionStatus,
};
pub use waiter::{ConfirmationWaiter, WaitConfig};
