//! Authenticated HTTP plumbing shared by the Google Workspace clients.
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin wrapper that attaches the bearer token and maps error statuses.
#[derive(Clone)]
pub struct GoogleApi {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for GoogleApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

pub(crate) fn build_http(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("daily-briefing/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .no_proxy()
        .build()
        .context("failed to build HTTP client")
}

impl GoogleApi {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid Google API base URL: {base_url}"))?;
        Ok(Self {
            http: build_http(timeout)?,
            base_url,
            token,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid API path {path}"))
    }

    pub fn build_request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let mut builder = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.build().context("failed to build Google API request")
    }

    /// Execute a request and decode the JSON response body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T> {
        let request = self.build_request(method, url, body)?;
        debug!(method=%request.method(), url=%request.url(), "sending google request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Google API")?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by Google API: {}", body);
            return Err(anyhow!("received 429 from Google API: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "Google API error: {}", body);
            return Err(anyhow!("google api error {}: {}", status, body));
        }

        let text = res.text().await.context("failed to read Google API response")?;
        debug!(%status, bytes = text.len(), "google response");
        serde_json::from_str(&text).context("invalid Google API response JSON")
    }
}
