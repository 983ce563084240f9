//! Chat relay HTTP handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info_span};
use ulid::Ulid;

use crate::llm::{LLMError, ResponseShape};
use crate::response;
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
pub struct ChatReply {
    reply: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let span = info_span!("chat", request_id = %Ulid::new());
    relay(state, payload).instrument(span).await
}

async fn relay(state: AppState, payload: Result<Json<ChatRequest>, JsonRejection>) -> Response {
    let message = match payload {
        Ok(Json(ChatRequest {
            message: Some(message),
        })) if !message.is_empty() => message,
        Ok(_) => {
            debug!("rejected request without message");
            return response::bad_request("no message").into_response();
        }
        Err(rejection) => {
            debug!(error = %rejection, "rejected malformed request body");
            return response::bad_request(format!(
                "invalid request body: {}",
                rejection.body_text()
            ))
            .into_response();
        }
    };

    match state.provider.generate(&message).await {
        Ok(body) => {
            let shape = ResponseShape::classify(&body);
            debug!(shape = shape.kind(), "extracted reply");
            let reply = ChatReply {
                reply: shape.into_reply(),
            };
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(e) => {
            let raw = state.expose_error_detail.then(|| format!("{e:?}"));
            match e {
                LLMError::Api { status, body } => {
                    error!(status, body = %body, "Gemini API error");
                    response::internal_error(body, raw).into_response()
                }
                other => {
                    error!(error = %other, timeout = other.is_timeout(), "upstream request failed");
                    response::internal_error(other.to_string(), raw).into_response()
                }
            }
        }
    }
}
