use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use kofi_core::api::{SubmitTransactionRequest, SubmitTransactionResponse, MISSING_SERIALIZED_DATA};
use kofi_core::TransportEnvelope;

use crate::error::HandlerError;
use crate::RelayContext;

/// Co-signs the posted envelope as fee payer and submits it.
///
/// Returns the chain's transaction hash on success.
pub async fn handle_submit_transaction(
    State(ctx): State<Arc<RelayContext>>,
    payload: Result<Json<SubmitTransactionRequest>, JsonRejection>,
) -> Result<Json<SubmitTransactionResponse>, HandlerError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!("Rejected request body: {}", e.body_text());
        let status = match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        HandlerError(status, format!("Invalid request body: {}", e.body_text()))
    })?;

    let serialized = request
        .serialized_data
        .filter(|data| !data.trim().is_empty())
        .ok_or_else(|| {
            HandlerError(StatusCode::BAD_REQUEST, MISSING_SERIALIZED_DATA.to_string())
        })?;

    let result = ctx.relay.relay(&TransportEnvelope::from(serialized)).await?;

    Ok(Json(SubmitTransactionResponse {
        success: true,
        transaction_hash: result.hash,
    }))
}
