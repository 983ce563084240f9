use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tracing::warn;

use crate::config::ServerConfig;
use crate::handlers;
use crate::llm::LLMProvider;
use crate::response::{self, ErrorResponse};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn LLMProvider>,
    pub expose_error_detail: bool,
}

pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .route("/chat", post(handlers::chat))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_seconds,
                ))),
        );

    match config.max_concurrent_requests {
        Some(limit) => app.layer(GlobalConcurrencyLimitLayer::new(limit)),
        None => app,
    }
}

/// Turns middleware failures into the same JSON error bodies the handlers use.
async fn handle_middleware_error(err: BoxError) -> ErrorResponse {
    if err.is::<Elapsed>() {
        warn!("request timed out");
        response::internal_error("request timed out", None)
    } else {
        response::internal_error(err.to_string(), None)
    }
}
