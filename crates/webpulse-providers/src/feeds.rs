use std::sync::Arc;

use async_trait::async_trait;
use webpulse_models::{FeedItem, FeedsConfig};

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// A syndication source. Mockable for testing.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;

    /// Entries in document order.
    async fn fetch_items(&self) -> Result<Vec<FeedItem>, UpstreamError>;
}

/// An RSS or Atom feed fetched over HTTP.
pub struct HttpFeedSource {
    name: String,
    url: String,
    client: UpstreamClient,
}

impl HttpFeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: UpstreamClient) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_items(&self) -> Result<Vec<FeedItem>, UpstreamError> {
        let body = self.client.get_bytes(&self.name, &self.url).await?;
        parse_feed(&body)
    }
}

/// One source per configured feed.
pub fn feed_sources(client: &UpstreamClient, config: &FeedsConfig) -> Vec<Arc<dyn FeedSource>> {
    config
        .sources
        .iter()
        .map(|s| {
            Arc::new(HttpFeedSource::new(&s.name, &s.url, client.clone())) as Arc<dyn FeedSource>
        })
        .collect()
}

/// Parse an RSS 0.9x/2.0, RSS 1.0 or Atom document.
pub fn parse_feed(body: &[u8]) -> Result<Vec<FeedItem>, UpstreamError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| UpstreamError::Feed(e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| FeedItem {
            title: entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "(untitled)".to_string()),
            url: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            summary: entry
                .summary
                .map(|t| t.content.trim().to_string())
                .filter(|s| !s.is_empty()),
            published: entry.published,
            updated: entry.updated,
        })
        .collect())
}
