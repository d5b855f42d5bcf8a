//! Kofi relay - HTTP surface for sponsored transaction submission
//!
//! Clients post a base64 envelope holding a transaction and the sender's
//! signature; the relay signs as fee payer and submits it to the chain.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use kofi_core::api::{FEE_PAYER_PATH, HEALTH_PATH, SUBMIT_TRANSACTION_PATH};
use kofi_core::{Network, SponsorRelay};
use tracing::Instrument;

pub use config::RelayConfig;
pub use error::HandlerError;

/// Largest request body accepted; a real envelope is a few hundred bytes.
pub const MAX_REQUEST_BODY: usize = 64 * 1024;

/// Shared state behind every route.
pub struct RelayContext {
    pub relay: SponsorRelay,
    pub network: Network,
}

impl RelayContext {
    pub fn new(relay: SponsorRelay, network: Network) -> Self {
        Self { relay, network }
    }
}

pub fn build_router(ctx: Arc<RelayContext>) -> Router {
    Router::new()
        .route(SUBMIT_TRANSACTION_PATH, post(routes::handle_submit_transaction))
        .route(FEE_PAYER_PATH, get(routes::handle_fee_payer))
        .route(HEALTH_PATH, get(routes::handle_health))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(middleware::from_fn(request_span))
        .with_state(ctx)
}

/// Runs each request inside a span tagged with a fresh request id.
async fn request_span(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        id = %uuid::Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let response = next.run(request).await;
        tracing::info!("Responded {}", response.status());
        response
    }
    .instrument(span)
    .await
}
