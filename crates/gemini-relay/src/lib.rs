//! gemini-relay - A minimal HTTP relay from a local chat endpoint to the Gemini API.

pub mod config;
pub mod handlers;
pub mod llm;
pub mod response;
pub mod server;
