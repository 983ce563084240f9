//! Gemini upstream: endpoint resolution, client and reply extraction.

mod client;
mod endpoint;
mod error;
mod reply;

pub use client::{GeminiClient, LLMProvider, build_http_client};
pub use endpoint::{
    CredentialTransport, ModelFamily, Operation, RequestBody, UpstreamEndpoint,
};
pub use error::LLMError;
pub use reply::{NO_RESPONSE_PLACEHOLDER, ResponseShape, extract_reply};
