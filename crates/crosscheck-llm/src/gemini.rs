use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crosscheck_core::{Credential, GenerationError, GenerationRequest, TextGenerator};

use crate::sanitize::sanitize_error_text;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Connection settings for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// `TextGenerator` backed by Google Gemini.
///
/// The client holds no credential; each call receives one.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GenerationError::Unreachable(err.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn with_client(config: GeminiConfig, http: Client) -> Self {
        Self { config, http }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn generate_text(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<String, GenerationError> {
        if credential.is_blank() {
            return Err(GenerationError::MissingCredential);
        }
        let key = credential.api_key().trim();

        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|err| transport_error(&err, key, self.config.request_timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport_error(&err, key, self.config.request_timeout))?;
        debug!(
            event = "generation_response",
            model = %request.model,
            status = status.as_u16(),
            bytes = body.len()
        );

        if !status.is_success() {
            return Err(status_error(status, &sanitize_error_text(&body, Some(key))));
        }
        parse_response(&body)
    }
}

/// Build the `generateContent` JSON body.
pub fn request_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }],
        "generationConfig": {
            "temperature": request.temperature,
            "maxOutputTokens": request.max_output_tokens,
        },
    });
    if !request.system_instruction.trim().is_empty() {
        body["systemInstruction"] = json!({
            "parts": [{ "text": request.system_instruction }],
        });
    }
    body
}

/// Concatenate the text parts of the first candidate.
pub fn parse_response(body: &str) -> Result<String, GenerationError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| GenerationError::MalformedResponse(format!("invalid JSON: {err}")))?;

    let parts = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array);
    let Some(parts) = parts else {
        if let Some(reason) = value.pointer("/promptFeedback/blockReason").and_then(Value::as_str)
        {
            return Err(GenerationError::MalformedResponse(format!(
                "prompt blocked: {reason}"
            )));
        }
        let finish = value
            .pointer("/candidates/0/finishReason")
            .and_then(Value::as_str)
            .unwrap_or("no candidates");
        return Err(GenerationError::MalformedResponse(format!(
            "response has no content ({finish})"
        )));
    };

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(GenerationError::MalformedResponse(
            "response text is empty".to_string(),
        ));
    }
    Ok(text)
}

fn status_error(status: StatusCode, detail: &str) -> GenerationError {
    let message = format!("status {}: {detail}", status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::InvalidCredential(message),
        StatusCode::BAD_REQUEST
            if detail.contains("API_KEY_INVALID") || detail.contains("API key not valid") =>
        {
            GenerationError::InvalidCredential(message)
        }
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(message),
        _ if status.is_server_error() => GenerationError::Unreachable(message),
        _ => GenerationError::MalformedResponse(format!("request rejected, {message}")),
    }
}

fn transport_error(err: &reqwest::Error, key: &str, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        return GenerationError::Timeout(timeout.as_secs());
    }
    GenerationError::Unreachable(sanitize_error_text(&err.to_string(), Some(key)))
}
