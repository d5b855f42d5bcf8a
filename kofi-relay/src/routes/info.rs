use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use kofi_core::api::{FeePayerResponse, HealthResponse};

use crate::RelayContext;

/// Address clients must name in the fee payer slot.
pub async fn handle_fee_payer(State(ctx): State<Arc<RelayContext>>) -> Json<FeePayerResponse> {
    Json(FeePayerResponse {
        fee_payer: ctx.relay.fee_payer_address(),
    })
}

pub async fn handle_health(State(ctx): State<Arc<RelayContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        network: ctx.network.to_string(),
    })
}
