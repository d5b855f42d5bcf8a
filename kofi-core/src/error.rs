use thiserror::Error;

pub type Result<T> = std::result::Result<T, KofiError>;

#[derive(Error, Debug)]
pub enum KofiError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Signing request rejected by user")]
    UserRejected,

    #[error("Signing unavailable: {0}")]
    SigningUnavailable(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Not fee payer: {0}")]
    NotFeePayer(String),

    #[error("{0}")]
    TransactionError(String),

    #[error("Timed out waiting for transaction {hash}")]
    TimedOut { hash: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: need {need}, have {available}")]
    InsufficientBalance { need: u64, available: u64 },

    #[error("Network connection error: {0}")]
    NetworkConnection(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KofiError {
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn signing_unavailable(msg: impl Into<String>) -> Self {
        Self::SigningUnavailable(msg.into())
    }

    pub fn malformed_envelope(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }

    pub fn not_fee_payer(msg: impl Into<String>) -> Self {
        Self::NotFeePayer(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::TransactionError(msg.into())
    }

    pub fn network_connection(msg: impl Into<String>) -> Self {
        Self::NetworkConnection(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn keystore(msg: impl Into<String>) -> Self {
        Self::Keystore(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a fresh transaction may be built and submitted after this error.
    ///
    /// Only chain-level rejections qualify: the rejected bytes never landed, so a
    /// rebuilt transaction (new sequence number, new signatures) cannot double-spend.
    pub fn is_rebuildable(&self) -> bool {
        matches!(self, KofiError::TransactionError(_))
    }
}

impl From<reqwest::Error> for KofiError {
    fn from(err: reqwest::Error) -> Self {
        KofiError::NetworkConnection(err.to_string())
    }
}
