//! LLM error types.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when calling the upstream API.
#[derive(Debug, Error)]
pub enum LLMError {
    /// No response: DNS, connect, TLS or timeout failure.
    ///
    /// The request URL is stripped since it may carry the API key.
    #[error("http request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Upstream answered with a non-success status.
    ///
    /// `body` is the parsed JSON payload, or the raw text as a JSON string.
    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: Value },

    /// Upstream answered with success but the body is not JSON.
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Request(err.without_url())
    }
}

impl LLMError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LLMError::Request(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_error_display_includes_body() {
        let err = LLMError::Api {
            status: 403,
            body: json!({ "error": { "message": "API key not valid" } }),
        };
        let text = err.to_string();
        assert!(text.contains("status 403"));
        assert!(text.contains("API key not valid"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn decode_error_display() {
        let source = serde_json::from_str::<Value>("<html>").unwrap_err();
        let err = LLMError::from(source);
        assert!(
            err.to_string()
                .starts_with("failed to decode upstream response")
        );
    }
}
