use crate::chain::ChainClient;
use crate::error::{KofiError, Result};
use crate::transaction::{AbiRegistry, EntryFunction, RawTransaction, UnsignedTransaction};
use crate::types::AccountAddress;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration: Duration,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_gas_amount: 200_000,
            gas_unit_price: 100,
            expiration: Duration::from_secs(60),
        }
    }
}

/// Builds unsigned transactions, reserving a fee-payer slot when sponsored.
pub struct TransactionBuilder {
    chain: Arc<dyn ChainClient>,
    registry: AbiRegistry,
    options: BuildOptions,
}

impl TransactionBuilder {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            registry: AbiRegistry::kofi(),
            options: BuildOptions::default(),
        }
    }

    pub fn with_registry(mut self, registry: AbiRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &AbiRegistry {
        &self.registry
    }

    /// Build a transaction for `sender`.
    ///
    /// The payload is validated before any chain query, so a malformed
    /// operation never costs a network round trip.
    pub async fn build(
        &self,
        sender: AccountAddress,
        payload: EntryFunction,
        fee_payer: Option<AccountAddress>,
    ) -> Result<UnsignedTransaction> {
        self.registry.validate(&payload)?;

        if self.options.max_gas_amount == 0 || self.options.gas_unit_price == 0 {
            return Err(KofiError::invalid_operation(
                "Gas amount and gas unit price must be greater than 0",
            ));
        }

        let chain_id = self.chain.chain_id().await?;
        let sequence_number = self.chain.sequence_number(sender).await?;
        let expiration_timestamp_secs =
            Utc::now().timestamp().max(0) as u64 + self.options.expiration.as_secs();

        let raw = RawTransaction {
            sender,
            sequence_number,
            payload,
            max_gas_amount: self.options.max_gas_amount,
            gas_unit_price: self.options.gas_unit_price,
            expiration_timestamp_secs,
            chain_id,
        };

        tracing::debug!(
            "Built transaction for {} (seq {}, sponsored: {})",
            sender,
            sequence_number,
            fee_payer.is_some()
        );
        Ok(UnsignedTransaction::new(raw, fee_payer))
    }
}
