use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kofi_core::api::{ErrorResponse, TRANSACTION_ERROR_PREFIX};
use kofi_core::KofiError;

/// Error returned by route handlers: a status code and the message put in
/// the `{ "error": ... }` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError(pub StatusCode, pub String);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

impl From<KofiError> for HandlerError {
    fn from(err: KofiError) -> Self {
        match err {
            KofiError::MalformedEnvelope(_) => HandlerError(StatusCode::BAD_REQUEST, err.to_string()),
            KofiError::NotFeePayer(_) => HandlerError(StatusCode::FORBIDDEN, err.to_string()),
            KofiError::TransactionError(_) => HandlerError(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{}{}", TRANSACTION_ERROR_PREFIX, err),
            ),
            // the node may have accepted the transaction; callers must not resubmit
            _ => HandlerError(StatusCode::BAD_GATEWAY, err.to_string()),
        }
    }
}
