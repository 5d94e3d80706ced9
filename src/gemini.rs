//! Client for the Gemini `generateContent` endpoint.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::AttemptError;
use crate::google::build_http;

/// A text-generation provider addressed by model identifier.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `prompt` to `model`. On a success status returns the raw response
    /// envelope; transport faults and error statuses are `AttemptError`s.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AttemptError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    temperature: f32,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

/// Response envelope; only the first candidate's first text part is used.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: String, temperature: f32, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid Gemini base URL: {base_url}"))?;
        Ok(Self {
            http: build_http(timeout)?,
            base_url,
            api_key,
            temperature,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.gemini.base_url,
            cfg.gemini.api_key.clone(),
            cfg.gemini.temperature,
            cfg.http_timeout(),
        )
    }

    pub fn build_request(&self, model: &str, prompt: &str) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .context("invalid Gemini endpoint")?;

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.temperature,
            },
        };
        self.http
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .build()
            .context("failed to build Gemini request")
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    #[instrument(skip_all, fields(model = %model))]
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AttemptError> {
        let request = self
            .build_request(model, prompt)
            .map_err(|e| AttemptError::Transport(format!("{e:#}")))?;
        debug!(prompt_len = prompt.len(), "sending generateContent request");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(|e| AttemptError::Transport(e.without_url().to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| AttemptError::Transport(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(%status, bytes = body.len(), "generateContent response");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn client() -> GeminiClient {
        GeminiClient::new(
            "https://generativelanguage.googleapis.com/",
            "secret-key".into(),
            0.2,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn build_request_targets_model_endpoint() {
        let request = client().build_request("gemini-2.5-flash", "hi").unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().path(),
            "/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(request.url().query(), None);
        assert_eq!(
            request
                .headers()
                .get("x-goog-api-key")
                .and_then(|h| h.to_str().ok()),
            Some("secret-key")
        );

        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        let body: Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            body["generationConfig"]["response_mime_type"],
            "application/json"
        );
        let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.2).abs() < 1e-6);
    }

    #[test]
    fn first_text_walks_envelope() {
        let env: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":1}"}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(env.first_text(), Some("{\"a\":1}"));

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.first_text(), None);
    }

    #[tokio::test]
    async fn transport_error_omits_api_key() {
        let client = GeminiClient::new(
            "http://127.0.0.1:1/",
            "SUPERSECRETKEY".into(),
            0.2,
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.generate("m", "hi").await.unwrap_err();
        assert!(matches!(err, AttemptError::Transport(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"), "{err}");
    }

    #[test]
    fn debug_hides_api_key() {
        assert!(!format!("{:?}", client()).contains("secret-key"));
    }
}
