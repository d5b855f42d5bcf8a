use crate::error::{KofiError, Result};
use crate::signer::SigningCapability;
use crate::transaction::{SenderAuthorization, UnsignedTransaction};
use crate::types::AccountAddress;
use async_trait::async_trait;
use std::sync::Arc;

/// Asks a human whether to sign. `Ok(false)` means declined.
pub type ConfirmPrompt = Arc<dyn Fn(&str) -> std::io::Result<bool> + Send + Sync>;

/// Wraps a capability so every signature needs an explicit "yes".
pub struct ConfirmingSigner<S> {
    inner: S,
    prompt: ConfirmPrompt,
}

impl<S: SigningCapability> ConfirmingSigner<S> {
    /// Prompt on the terminal.
    pub fn new(inner: S) -> Self {
        Self::with_prompt(inner, Arc::new(terminal_prompt))
    }

    pub fn with_prompt(inner: S, prompt: ConfirmPrompt) -> Self {
        Self { inner, prompt }
    }
}

fn terminal_prompt(summary: &str) -> std::io::Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(summary)
        .default(false)
        .interact()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

/// One-line description of what the user is about to approve.
pub fn describe(transaction: &UnsignedTransaction) -> String {
    let payload = transaction.payload();
    let args: Vec<String> = payload.arguments.iter().map(|a| format!("{:?}", a)).collect();
    let gas = match transaction.fee_payer() {
        Some(sponsor) => format!("gas paid by {}", sponsor),
        None => "gas paid by sender".to_string(),
    };

    format!(
        "Sign {}({}) from {} (seq {}, {})?",
        payload.function,
        args.join(", "),
        transaction.sender(),
        transaction.sequence_number(),
        gas
    )
}

#[async_trait]
impl<S: SigningCapability + 'static> SigningCapability for ConfirmingSigner<S> {
    fn address(&self) -> AccountAddress {
        self.inner.address()
    }

    async fn authorize(&self, transaction: &UnsignedTransaction) -> Result<SenderAuthorization> {
        let summary = describe(transaction);
        let prompt = self.prompt.clone();

        let approved = tokio::task::spawn_blocking(move || prompt(&summary))
            .await
            .map_err(|e| KofiError::signing_unavailable(format!("Signing prompt failed: {}", e)))?
            .map_err(|e| KofiError::signing_unavailable(format!("Signing prompt failed: {}", e)))?;

        if !approved {
            tracing::info!("User declined to sign transaction from {}", transaction.sender());
            return Err(KofiError::UserRejected);
        }

        self.inner.authorize(transaction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{AccountKey, LocalAccount};
    use crate::transaction::test_helpers::raw_transaction;

    fn setup(answer: std::io::Result<bool>) -> (ConfirmingSigner<LocalAccount>, UnsignedTransaction) {
        let key = AccountKey::generate();
        let tx = UnsignedTransaction::new(raw_transaction(key.address(), 0), None);
        let answer = std::sync::Mutex::new(Some(answer));
        let prompt: ConfirmPrompt = Arc::new(move |_| {
            answer
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(false))
        });
        (ConfirmingSigner::with_prompt(LocalAccount::new(key), prompt), tx)
    }

    #[tokio::test]
    async fn test_approved_signs() {
        let (signer, tx) = setup(Ok(true));
        let auth = signer.authorize(&tx).await.unwrap();
        assert!(auth.inner().verify(&tx.signing_message().unwrap()));
    }

    #[tokio::test]
    async fn test_declined_is_user_rejected() {
        let (signer, tx) = setup(Ok(false));
        assert!(matches!(signer.authorize(&tx).await, Err(KofiError::UserRejected)));
    }

    #[tokio::test]
    async fn test_broken_terminal_is_unavailable() {
        let (signer, tx) = setup(Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not a terminal",
        )));
        assert!(matches!(
            signer.authorize(&tx).await,
            Err(KofiError::SigningUnavailable(_))
        ));
    }

    #[test]
    fn test_describe_mentions_sponsor() {
        let sender = AccountAddress::new([1u8; 32]);
        let sponsor = AccountAddress::new([2u8; 32]);
        let tx = UnsignedTransaction::new(raw_transaction(sender, 3), Some(sponsor));
        let summary = describe(&tx);
        assert!(summary.contains("0x1::aptos_account::transfer"));
        assert!(summary.contains(&format!("gas paid by {}", sponsor)));
        assert!(summary.contains("seq 3"));
    }
}
