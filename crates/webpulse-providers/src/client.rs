use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use webpulse_models::UpstreamConfig;

use crate::error::UpstreamError;

/// Longest upstream error body kept in diagnostics.
const MAX_ERROR_BODY: usize = 200;

/// Shared outbound HTTP client.
///
/// Every request carries a timeout and any non-2xx status becomes
/// [`UpstreamError::Status`]. Cloning is cheap; clones share the connection
/// pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    /// A clone of this client with a different per-request timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            http: self.http.clone(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET a URL and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let mut request = self.http.get(url).query(query);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let bytes = self.send(provider, request).await?;
        decode(provider, &bytes)
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<B, T>(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let bytes = self.send(provider, request).await?;
        decode(provider, &bytes)
    }

    /// GET a URL and return the raw body.
    pub async fn get_bytes(&self, provider: &str, url: &str) -> Result<Vec<u8>, UpstreamError> {
        self.send(provider, self.http.get(url)).await
    }

    async fn send(&self, provider: &str, request: RequestBuilder) -> Result<Vec<u8>, UpstreamError> {
        debug!(provider, timeout_s = self.timeout.as_secs(), "Upstream request");

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status = status.as_u16(), "Upstream returned error status");
            return Err(UpstreamError::Status {
                provider: provider.to_string(),
                status: status.as_u16(),
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify(provider, e))?;
        Ok(bytes.to_vec())
    }

    fn classify(&self, provider: &str, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(provider.to_string(), self.timeout.as_secs())
        } else {
            UpstreamError::Http(err)
        }
    }
}

fn decode<T: DeserializeOwned>(provider: &str, bytes: &[u8]) -> Result<T, UpstreamError> {
    serde_json::from_slice(bytes)
        .map_err(|e| UpstreamError::Decode(format!("{provider}: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
