//! JSON error responses.
//!
//! Every failure leaves the relay as `{ "error": ... }` with an optional
//! `raw` diagnostic field.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message, or the upstream error payload as-is.
    pub error: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn bad_request(message: impl Into<String>) -> ErrorResponse {
    error_response(StatusCode::BAD_REQUEST, Value::String(message.into()), None)
}

pub fn internal_error(error: impl Into<Value>, raw: Option<String>) -> ErrorResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, error.into(), raw)
}

fn error_response(status: StatusCode, error: Value, raw: Option<String>) -> ErrorResponse {
    (status, Json(ErrorBody { error, raw }))
}
