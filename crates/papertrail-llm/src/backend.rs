//! LLM backend trait and the Gemini implementation.
//!
//! Backends:
//!   GeminiBackend — Google Gemini API (`models/{model}:generateContent`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Response did not contain generated text")]
    MissingContent,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send one prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
    fn model_id(&self) -> &str;
}

/// Read the body, logging status, headers and body of any non-200 answer.
async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.text().await?;

    if status != StatusCode::OK {
        warn!(
            status = status.as_u16(),
            ?headers,
            body = %body,
            "Summarizer returned a non-200 response"
        );
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| "unknown API error".to_string());
        return Err(LlmError::ApiError { status: status.as_u16(), message });
    }

    Ok(serde_json::from_str(&body)?)
}

// ── Google Gemini ─────────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self.client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;

        let Some(content) = json["candidates"][0]["content"]["parts"][0]["text"].as_str() else {
            warn!(response = %json, "Summarizer response has no candidate text");
            return Err(LlmError::MissingContent);
        };

        debug!(
            prompt_tokens = json["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0),
            completion_tokens = json["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0),
            "Gemini completion received"
        );
        Ok(content.to_string())
    }

    fn model_id(&self) -> &str { &self.model }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use papertrail_test_utils::{serve_once, MockResponse};
    use pretty_assertions::assert_eq;

    fn backend(base_url: &str, timeout: Duration) -> GeminiBackend {
        GeminiBackend::new(SecretString::from("AIza-test".to_string()), DEFAULT_GEMINI_MODEL, timeout)
            .unwrap()
            .with_base_url(base_url)
    }

    #[test]
    fn test_model_id() {
        let b = backend(GEMINI_BASE_URL, Duration::from_secs(1));
        assert_eq!(b.model_id(), "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_complete_extracts_first_candidate_text() {
        let server = serve_once(MockResponse::ok(
            "application/json",
            r#"{"candidates":[{"content":{"parts":[{"text":"Two sentences."},{"text":"ignored"}]}}],
                "usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":4}}"#,
        ))
        .await;

        let text = backend(&server.base_url, Duration::from_secs(5))
            .complete("Summarize this")
            .await
            .unwrap();
        assert_eq!(text, "Two sentences.");

        let raw = server.request().await;
        assert!(raw.starts_with("POST /models/gemini-2.0-flash:generateContent?key=AIza-test "));
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, serde_json::json!({ "contents": [{ "parts": [{ "text": "Summarize this" }] }] }));
    }

    #[tokio::test]
    async fn test_non_200_is_api_error() {
        let server = serve_once(MockResponse::status(
            429,
            r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#,
        ))
        .await;

        let err = backend(&server.base_url, Duration::from_secs(5))
            .complete("x")
            .await
            .unwrap_err();
        match err {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_missing_content() {
        let server = serve_once(MockResponse::ok("application/json", r#"{"candidates":[]}"#)).await;

        let err = backend(&server.base_url, Duration::from_secs(5))
            .complete("x")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingContent));
    }
}
