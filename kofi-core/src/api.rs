//! JSON bodies of the relay's HTTP surface, shared by server and client.

use crate::types::{AccountAddress, TransactionHash};
use serde::{Deserialize, Serialize};

pub const SUBMIT_TRANSACTION_PATH: &str = "/api/submit-transaction";
pub const FEE_PAYER_PATH: &str = "/api/fee-payer";
pub const HEALTH_PATH: &str = "/api/health";

pub const MISSING_SERIALIZED_DATA: &str = "Missing serialized data in request body";
pub const TRANSACTION_ERROR_PREFIX: &str = "Transaction error: ";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitTransactionRequest {
    #[serde(rename = "serializedData", default)]
    pub serialized_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTransactionResponse {
    pub success: bool,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: TransactionHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeePayerResponse {
    #[serde(rename = "feePayer")]
    pub fee_payer: AccountAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub network: String,
}
