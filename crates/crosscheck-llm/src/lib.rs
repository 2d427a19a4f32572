//! HTTP transport for the text-generation service.

pub mod gemini;
pub mod sanitize;

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, GeminiConfig, parse_response, request_body};
pub use sanitize::sanitize_error_text;
