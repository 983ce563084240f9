//! Reply extraction from upstream response bodies.
//!
//! The provider has changed its response layout across releases, so a body is
//! first classified into one of the known [`ResponseShape`]s and only then
//! turned into text. Unrecognized but non-empty payloads are returned
//! stringified rather than rejected.

use serde_json::Value;

/// Returned when the upstream produced nothing usable.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response from Gemini.";

/// Known upstream response layouts, in match priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// `candidates[0].content.parts[0].text`
    CandidateParts(String),
    /// `candidates[0].content.text` or `candidates[0].content[0].text`
    CandidateContent(String),
    /// `output[0].content[*].text`, newline-joined and trimmed
    OutputContent(String),
    /// Top-level `text`
    FlatText(String),
    /// `null`, `{}`, `[]` or `""`
    Empty,
    /// Anything else, stringified.
    Unrecognized(String),
}

impl ResponseShape {
    pub fn classify(body: &Value) -> Self {
        if let Some(text) = str_at(body, "/candidates/0/content/parts/0/text") {
            return ResponseShape::CandidateParts(text.to_string());
        }

        if let Some(text) = str_at(body, "/candidates/0/content/text")
            .or_else(|| str_at(body, "/candidates/0/content/0/text"))
        {
            return ResponseShape::CandidateContent(text.to_string());
        }

        if let Some(content) = body.pointer("/output/0/content").and_then(Value::as_array) {
            let texts: Vec<&str> = content
                .iter()
                .filter_map(|c| c.get("text").and_then(Value::as_str))
                .collect();
            if !texts.is_empty() {
                return ResponseShape::OutputContent(texts.join("\n").trim().to_string());
            }
        }

        if let Some(text) = body.get("text").and_then(Value::as_str) {
            return ResponseShape::FlatText(text.to_string());
        }

        if is_empty_payload(body) {
            return ResponseShape::Empty;
        }

        ResponseShape::Unrecognized(body.to_string())
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseShape::CandidateParts(_) => "candidate_parts",
            ResponseShape::CandidateContent(_) => "candidate_content",
            ResponseShape::OutputContent(_) => "output_content",
            ResponseShape::FlatText(_) => "flat_text",
            ResponseShape::Empty => "empty",
            ResponseShape::Unrecognized(_) => "unrecognized",
        }
    }

    /// Final reply text. Never empty.
    pub fn into_reply(self) -> String {
        let text = match self {
            ResponseShape::CandidateParts(text)
            | ResponseShape::CandidateContent(text)
            | ResponseShape::OutputContent(text)
            | ResponseShape::FlatText(text)
            | ResponseShape::Unrecognized(text) => text,
            ResponseShape::Empty => String::new(),
        };

        if text.is_empty() {
            NO_RESPONSE_PLACEHOLDER.to_string()
        } else {
            text
        }
    }
}

/// Best-effort reply text for an upstream response body.
pub fn extract_reply(body: &Value) -> String {
    ResponseShape::classify(body).into_reply()
}

fn str_at<'a>(body: &'a Value, pointer: &str) -> Option<&'a str> {
    body.pointer(pointer).and_then(Value::as_str)
}

fn is_empty_payload(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
