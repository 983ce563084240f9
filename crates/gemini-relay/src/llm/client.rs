//! Gemini API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::endpoint::{CredentialTransport, RequestBody, UpstreamEndpoint};
use super::error::LLMError;
use crate::config::UpstreamConfig;

/// Trait for upstream text generation.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send one user message and return the raw upstream JSON body.
    async fn generate(&self, message: &str) -> Result<Value, LLMError>;
}

/// Build the outbound HTTP client from upstream settings.
///
/// Certificate verification is only relaxed on this client instance.
pub fn build_http_client(config: &UpstreamConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
        .build()
}

/// Gemini provider bound to a single resolved endpoint.
pub struct GeminiClient {
    client: Client,
    endpoint: UpstreamEndpoint,
}

impl GeminiClient {
    #[must_use]
    pub fn new(client: Client, endpoint: UpstreamEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &UpstreamEndpoint {
        &self.endpoint
    }

    /// Build a POST request with the credential placed per endpoint family.
    fn build_request(&self, body: &RequestBody) -> reqwest::RequestBuilder {
        let mut url = self.endpoint.url().clone();

        let builder = match self.endpoint.credential_transport() {
            CredentialTransport::QueryParam => {
                url.query_pairs_mut()
                    .append_pair("key", self.endpoint.credential());
                self.client.post(url)
            }
            CredentialTransport::BearerHeader => self
                .client
                .post(url)
                .bearer_auth(self.endpoint.credential()),
        };

        builder
            .header("Content-Type", "application/json")
            .json(body)
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn generate(&self, message: &str) -> Result<Value, LLMError> {
        let body = self.endpoint.build_body(message);
        let response = self.build_request(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(LLMError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}
