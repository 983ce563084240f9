//! Upstream endpoint resolution.
//!
//! The Gemini API has moved its version segment and payload shape across
//! model generations. This module maps the configured model identifier to a
//! concrete URL, request body shape and credential transport:
//!
//! | Model prefix | Version segment           |
//! |--------------|---------------------------|
//! | `gemini-1`   | `api_versions.gemini_1`   |
//! | `gemini-2`   | `api_versions.gemini_2`   |
//! | anything else| `api_versions.fallback`   |
//!
//! The [`Operation`] picks the endpoint family. `generateContent` takes body
//! shape A with the key as a `key=` query parameter; the legacy
//! `generateText` takes body shape B with a bearer token.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ApiVersions, ConfigError, LegacyTextConfig, UpstreamConfig};

// ============================================================================
// Operation
// ============================================================================

/// Upstream endpoint family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    GenerateContent,
    /// Superseded `:generateText` family, kept for older deployments.
    GenerateText,
}

impl Operation {
    /// Method suffix used in the upstream URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GenerateContent => "generateContent",
            Operation::GenerateText => "generateText",
        }
    }

    pub fn credential_transport(&self) -> CredentialTransport {
        match self {
            Operation::GenerateContent => CredentialTransport::QueryParam,
            Operation::GenerateText => CredentialTransport::BearerHeader,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the API key travels with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTransport {
    /// `?key=<credential>`
    QueryParam,
    /// `Authorization: Bearer <credential>`
    BearerHeader,
}

// ============================================================================
// ModelFamily
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Gemini1,
    Gemini2,
    Other,
}

impl ModelFamily {
    pub fn classify(model: &str) -> Self {
        if model.starts_with("gemini-1") {
            ModelFamily::Gemini1
        } else if model.starts_with("gemini-2") {
            ModelFamily::Gemini2
        } else {
            ModelFamily::Other
        }
    }

    pub fn api_version<'a>(&self, versions: &'a ApiVersions) -> &'a str {
        match self {
            ModelFamily::Gemini1 => &versions.gemini_1,
            ModelFamily::Gemini2 => &versions.gemini_2,
            ModelFamily::Other => &versions.fallback,
        }
    }
}

// ============================================================================
// UpstreamEndpoint
// ============================================================================

/// Fully resolved upstream target. Built once at startup.
#[derive(Clone)]
pub struct UpstreamEndpoint {
    url: Url,
    model: String,
    api_version: String,
    operation: Operation,
    credential: String,
    legacy_text: LegacyTextConfig,
}

impl UpstreamEndpoint {
    pub fn resolve(config: &UpstreamConfig, credential: String) -> Result<Self, ConfigError> {
        let family = ModelFamily::classify(&config.model);
        let api_version = family.api_version(&config.api_versions).to_string();

        // Each piece is pushed as one encoded segment, so a model id can never
        // reach the query, the fragment or a parent path.
        let mut url = Url::parse(&config.base_url)?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::UnsupportedBaseUrl(config.base_url.clone()))?
            .pop_if_empty()
            .push(&api_version)
            .push("models")
            .push(&format!("{}:{}", config.model, config.operation.as_str()));

        Ok(Self {
            url,
            model: config.model.clone(),
            api_version,
            operation: config.operation,
            credential,
            legacy_text: config.legacy_text,
        })
    }

    /// Upstream URL without the credential.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn credential_transport(&self) -> CredentialTransport {
        self.operation.credential_transport()
    }

    /// Build the request body for a single user message.
    pub fn build_body(&self, message: &str) -> RequestBody {
        match self.operation {
            Operation::GenerateContent => RequestBody::GenerateContent(GenerateContentBody {
                contents: vec![Content {
                    role: USER_ROLE,
                    parts: vec![Part {
                        text: message.to_string(),
                    }],
                }],
            }),
            Operation::GenerateText => RequestBody::GenerateText(GenerateTextBody {
                prompt: Prompt {
                    messages: vec![PromptMessage {
                        role: USER_ROLE,
                        content: Part {
                            text: message.to_string(),
                        },
                    }],
                },
                temperature: self.legacy_text.temperature,
                max_output_tokens: self.legacy_text.max_output_tokens,
            }),
        }
    }
}

impl fmt::Debug for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamEndpoint")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .field("operation", &self.operation)
            .field("credential", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Request Bodies
// ============================================================================

const USER_ROLE: &str = "user";

/// Outbound payload. One variant per endpoint family.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    GenerateContent(GenerateContentBody),
    GenerateText(GenerateTextBody),
}

/// Shape A: `{ contents: [ { role, parts: [ { text } ] } ] }`.
#[derive(Debug, Serialize)]
pub struct GenerateContentBody {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// Shape B: `{ prompt: { messages: [ { role, content: { text } } ] }, temperature, maxOutputTokens }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTextBody {
    prompt: Prompt,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Prompt {
    messages: Vec<PromptMessage>,
}

#[derive(Debug, Serialize)]
struct PromptMessage {
    role: &'static str,
    content: Part,
}
