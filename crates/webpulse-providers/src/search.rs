use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use webpulse_models::{SearchConfig, SearchHit};

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// A web search engine. Mockable for testing.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn engine(&self) -> &str;

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, UpstreamError>;
}

/// Pick the configured engine: Brave first, then Serper, else none.
pub fn search_provider(
    client: &UpstreamClient,
    config: &SearchConfig,
) -> Option<Arc<dyn SearchProvider>> {
    let non_empty = |k: &Option<String>| k.clone().filter(|k| !k.is_empty());

    if let Some(key) = non_empty(&config.brave_api_key) {
        return Some(Arc::new(BraveSearch::new(client.clone(), &config.brave_url, key)));
    }
    if let Some(key) = non_empty(&config.serper_api_key) {
        return Some(Arc::new(SerperSearch::new(client.clone(), &config.serper_url, key)));
    }
    None
}

pub struct BraveSearch {
    client: UpstreamClient,
    url: String,
    api_key: String,
}

impl BraveSearch {
    pub fn new(client: UpstreamClient, url: &str, api_key: String) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn engine(&self) -> &str {
        "brave"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, UpstreamError> {
        let count = count.to_string();
        let body: Value = self
            .client
            .get_json(
                "brave",
                &self.url,
                &[("q", query), ("count", count.as_str()), ("freshness", "pd")],
                &[
                    ("accept", "application/json"),
                    ("X-Subscription-Token", self.api_key.as_str()),
                ],
            )
            .await?;
        Ok(parse_brave(&body))
    }
}

pub struct SerperSearch {
    client: UpstreamClient,
    url: String,
    api_key: String,
}

impl SerperSearch {
    pub fn new(client: UpstreamClient, url: &str, api_key: String) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    fn engine(&self) -> &str {
        "serper"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, UpstreamError> {
        let payload = serde_json::json!({"q": query, "num": count});
        let body: Value = self
            .client
            .post_json("serper", &self.url, &[("X-API-KEY", self.api_key.as_str())], &payload)
            .await?;
        Ok(parse_serper(&body, count))
    }
}

/// `{"web": {"results": [{"title", "url", "description", "page_age"}]}}`
pub fn parse_brave(body: &Value) -> Vec<SearchHit> {
    body.pointer("/web/results")
        .and_then(|v| v.as_array())
        .map(|results| {
            results
                .iter()
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "url"),
                    snippet: r
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    published: r
                        .get("page_age")
                        .and_then(|v| v.as_str())
                        .and_then(parse_page_age),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `{"organic": [{"title", "link", "snippet"}]}`. Serper dates are relative
/// ("3 hours ago") and are not kept.
pub fn parse_serper(body: &Value, count: usize) -> Vec<SearchHit> {
    body.get("organic")
        .and_then(|v| v.as_array())
        .map(|results| {
            results
                .iter()
                .take(count)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "link"),
                    snippet: r
                        .get("snippet")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    published: None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Brave reports `page_age` either as RFC 3339 or as a naive UTC timestamp.
fn parse_page_age(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|n| n.and_utc())
        })
}
