//! Sender-side signing.
//!
//! Key material stays inside a [`SigningCapability`]; callers only ever get a
//! [`SenderAuthorization`] back.

pub mod confirm;
pub mod key;

pub use confirm::{ConfirmPrompt, ConfirmingSigner};
pub use key::{AccountKey, LocalAccount};

use crate::error::{KofiError, Result};
use crate::transaction::{SenderAuthorization, UnsignedTransaction};
use crate::types::AccountAddress;
use async_trait::async_trait;
use futures::future::{abortable, AbortHandle, Aborted, BoxFuture};
use futures::FutureExt;
use parking_lot::RwLock;
use std::sync::Arc;

#[async_trait]
pub trait SigningCapability: Send + Sync {
    fn address(&self) -> AccountAddress;

    /// May wait on a human for as long as it takes.
    async fn authorize(&self, transaction: &UnsignedTransaction) -> Result<SenderAuthorization>;
}

/// The client's handle on whatever wallet is currently connected.
#[derive(Default)]
pub struct ClientSigner {
    capability: RwLock<Option<Arc<dyn SigningCapability>>>,
}

impl ClientSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(capability: Arc<dyn SigningCapability>) -> Self {
        let signer = Self::new();
        signer.connect(capability);
        signer
    }

    pub fn connect(&self, capability: Arc<dyn SigningCapability>) {
        tracing::info!("Wallet connected: {}", capability.address());
        *self.capability.write() = Some(capability);
    }

    pub fn disconnect(&self) {
        if self.capability.write().take().is_some() {
            tracing::info!("Wallet disconnected");
        }
    }

    pub fn address(&self) -> Option<AccountAddress> {
        self.capability.read().as_ref().map(|c| c.address())
    }

    pub async fn sign(&self, transaction: &UnsignedTransaction) -> Result<SenderAuthorization> {
        let capability = self.capability.read().clone();
        sign_with(capability, transaction).await
    }

    /// Start signing in a way the caller can call off.
    ///
    /// Aborting resolves the future to `UserRejected`; nothing is signed or
    /// sent. Dropping the future has the same effect.
    pub fn sign_abortable(
        &self,
        transaction: UnsignedTransaction,
    ) -> (BoxFuture<'static, Result<SenderAuthorization>>, AbortHandle) {
        let capability = self.capability.read().clone();
        let (signing, handle) =
            abortable(async move { sign_with(capability, &transaction).await });

        let future = async move {
            match signing.await {
                Ok(result) => result,
                Err(Aborted) => {
                    tracing::debug!("Signing request aborted");
                    Err(KofiError::UserRejected)
                }
            }
        }
        .boxed();

        (future, handle)
    }
}

async fn sign_with(
    capability: Option<Arc<dyn SigningCapability>>,
    transaction: &UnsignedTransaction,
) -> Result<SenderAuthorization> {
    let capability = capability
        .ok_or_else(|| KofiError::signing_unavailable("No wallet connected; reconnect wallet"))?;

    if capability.address() != transaction.sender() {
        return Err(KofiError::signing_unavailable(format!(
            "Connected wallet {} is not the sender {}; reconnect wallet",
            capability.address(),
            transaction.sender()
        )));
    }

    let authorization = capability.authorize(transaction).await?;

    let inner = authorization.inner();
    if inner.signer_address() != transaction.sender()
        || !inner.verify(&transaction.signing_message()?)
    {
        return Err(KofiError::signing_unavailable(
            "Wallet returned a signature that does not cover this transaction",
        ));
    }

    Ok(authorization)
}
