use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};
use webpulse_models::{Alert, FeedEntry, FeedItem, FeedsConfig, NewsDigest, SearchHit};
use webpulse_providers::{FeedSource, SearchProvider};

use crate::dedupe::dedupe;
use crate::sentiment::SentimentScorer;

/// Collects, filters, scores and deduplicates entries from the configured
/// feeds, optionally topped up with web search hits for a keyword.
pub struct FeedAggregator {
    sources: Vec<Arc<dyn FeedSource>>,
    search: Option<Arc<dyn SearchProvider>>,
    scorer: Arc<SentimentScorer>,
    per_source_limit: usize,
    source_timeout: Duration,
    search_count: usize,
    default_since: Duration,
    default_limit: usize,
    max_limit: usize,
}

impl FeedAggregator {
    pub fn new(
        sources: Vec<Arc<dyn FeedSource>>,
        scorer: Arc<SentimentScorer>,
        config: &FeedsConfig,
    ) -> Self {
        Self {
            sources,
            search: None,
            scorer,
            per_source_limit: config.per_source_limit,
            source_timeout: Duration::from_secs(config.source_timeout_seconds),
            search_count: 5,
            default_since: Duration::from_secs(config.default_since_minutes * 60),
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// Also query a search provider when a keyword is given.
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>, count: usize) -> Self {
        self.search = Some(search);
        self.search_count = count;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn default_since(&self) -> Duration {
        self.default_since
    }

    /// Caller-supplied limit, defaulted and capped.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }

    /// Entries newer than `since`, matching `keyword` when given, newest
    /// first, deduplicated and truncated to `limit`.
    pub async fn fetch(
        &self,
        keyword: Option<&str>,
        since: Duration,
        limit: usize,
    ) -> Vec<FeedEntry> {
        let now = Utc::now();
        let cutoff = chrono::Duration::from_std(since)
            .ok()
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.collect(keyword, cutoff, now, limit).await
    }

    async fn collect(
        &self,
        keyword: Option<&str>,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Vec<FeedEntry> {
        let keyword = keyword
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());

        let mut raw = self.fetch_sources().await;
        if let Some(keyword) = &keyword {
            raw.extend(self.fetch_search(keyword).await);
        }

        let mut entries: Vec<FeedEntry> = raw
            .into_iter()
            .filter_map(|(source_name, item)| {
                let published_at = item.resolve_timestamp(now);
                if published_at < cutoff {
                    return None;
                }
                let mut entry = FeedEntry {
                    source_name,
                    title: item.title,
                    url: item.url,
                    published_at,
                    sentiment_score: 0.0,
                    summary: item.summary,
                };
                let text = entry.searchable_text();
                if let Some(keyword) = &keyword {
                    if !text.to_lowercase().contains(keyword.as_str()) {
                        return None;
                    }
                }
                entry.sentiment_score = self.scorer.score(&text);
                Some(entry)
            })
            .collect();

        entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let mut entries = dedupe(entries);
        entries.truncate(limit);
        entries
    }

    /// [`fetch`](Self::fetch) plus mean sentiment and alert extraction.
    pub async fn digest(
        &self,
        keyword: Option<&str>,
        since: Duration,
        limit: usize,
    ) -> NewsDigest {
        let items = self.fetch(keyword, since, limit).await;
        let alerts = items
            .iter()
            .filter_map(|entry| {
                let matched = self.scorer.alert_matches(&entry.searchable_text());
                (!matched.is_empty()).then(|| Alert {
                    entry: entry.clone(),
                    matched,
                })
            })
            .collect();
        NewsDigest::new(items, alerts)
    }

    /// One-line headlines for the newest `limit` entries, whatever their age.
    pub async fn headlines(&self, limit: usize) -> Vec<String> {
        self.collect(None, DateTime::<Utc>::MIN_UTC, Utc::now(), limit)
            .await
            .iter()
            .map(FeedEntry::headline)
            .collect()
    }

    /// All sources concurrently. A failing or slow source is logged and
    /// contributes nothing.
    async fn fetch_sources(&self) -> Vec<(String, FeedItem)> {
        let fetches = self.sources.iter().map(|source| async move {
            let start = Instant::now();
            let name = source.name().to_string();
            let result = tokio::time::timeout(self.source_timeout, source.fetch_items()).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(Ok(items)) => {
                    debug!(source = %name, count = items.len(), elapsed_ms, "Feed fetched");
                    items
                        .into_iter()
                        .take(self.per_source_limit)
                        .map(|item| (name.clone(), item))
                        .collect::<Vec<_>>()
                }
                Ok(Err(e)) => {
                    warn!(source = %name, error = %e, elapsed_ms, "Feed failed, skipping");
                    Vec::new()
                }
                Err(_) => {
                    warn!(
                        source = %name,
                        timeout_s = self.source_timeout.as_secs(),
                        "Feed timed out, skipping"
                    );
                    Vec::new()
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    async fn fetch_search(&self, keyword: &str) -> Vec<(String, FeedItem)> {
        let Some(search) = &self.search else {
            return Vec::new();
        };
        let engine = search.engine().to_string();

        match tokio::time::timeout(self.source_timeout, search.search(keyword, self.search_count)).await {
            Ok(Ok(hits)) => {
                debug!(engine = %engine, count = hits.len(), "Search hits appended");
                hits.into_iter()
                    .map(|hit| (engine.clone(), search_hit_item(hit)))
                    .collect()
            }
            Ok(Err(e)) => {
                warn!(engine = %engine, error = %e, "Search failed, ignoring");
                Vec::new()
            }
            Err(_) => {
                warn!(engine = %engine, "Search timed out, ignoring");
                Vec::new()
            }
        }
    }
}

fn search_hit_item(hit: SearchHit) -> FeedItem {
    FeedItem {
        title: hit.title,
        url: hit.url,
        summary: hit.snippet,
        published: hit.published,
        updated: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{item_at, MockFeedSource, MockSearchProvider};
    use chrono::Duration as ChronoDuration;
    use webpulse_models::SentimentConfig;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn aggregator(sources: Vec<Arc<dyn FeedSource>>) -> FeedAggregator {
        FeedAggregator::new(
            sources,
            Arc::new(SentimentScorer::from_config(&SentimentConfig::default())),
            &FeedsConfig::default(),
        )
        .with_source_timeout(Duration::from_millis(200))
    }

    fn hours_ago(h: i64) -> DateTime<Utc> {
        Utc::now() - ChronoDuration::hours(h)
    }

    #[tokio::test]
    async fn merges_sources_newest_first() {
        let a = MockFeedSource::new(
            "CoinDesk",
            vec![item_at("Older CoinDesk", hours_ago(5)), item_at("Newest", hours_ago(1))],
        );
        let b = MockFeedSource::new("The Block", vec![item_at("Middle", hours_ago(3))]);
        let agg = aggregator(vec![Arc::new(a), Arc::new(b)]);

        let entries = agg.fetch(None, DAY, 10).await;
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest", "Middle", "Older CoinDesk"]);
        assert_eq!(entries[1].source_name, "The Block");
    }

    #[tokio::test]
    async fn entries_outside_window_are_dropped() {
        let source = MockFeedSource::new(
            "CoinDesk",
            vec![item_at("fresh", hours_ago(1)), item_at("stale", hours_ago(30))],
        );
        let agg = aggregator(vec![Arc::new(source)]);

        let entries = agg.fetch(None, Duration::from_secs(2 * 3600), 10).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "fresh");
    }

    #[tokio::test]
    async fn undated_entries_count_as_fresh() {
        let undated = FeedItem {
            title: "No date".to_string(),
            url: "https://example.com/x".to_string(),
            ..Default::default()
        };
        let agg = aggregator(vec![Arc::new(MockFeedSource::new("Reuters", vec![undated]))]);

        let entries = agg.fetch(None, Duration::from_secs(60), 10).await;
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn per_source_limit_takes_document_order() {
        let items = (0..6)
            .map(|i| item_at(&format!("item {i}"), hours_ago(i + 1)))
            .collect();
        let agg = aggregator(vec![Arc::new(MockFeedSource::new("CoinDesk", items))]);

        let entries = agg.fetch(None, DAY, 50).await;
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].title, "item 3");
    }

    #[tokio::test]
    async fn failing_and_slow_sources_are_skipped() {
        let ok = MockFeedSource::new("CoinDesk", vec![item_at("ok", hours_ago(1))]);
        let broken = MockFeedSource::failing("Broken");
        let slow = MockFeedSource::new("Slow", vec![item_at("late", hours_ago(1))])
            .with_delay(Duration::from_secs(5));
        let agg = aggregator(vec![Arc::new(broken), Arc::new(slow), Arc::new(ok)]);

        let entries = agg.fetch(None, DAY, 10).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "ok");
    }

    #[tokio::test]
    async fn keyword_filters_title_and_summary() {
        let mut with_summary = item_at("Markets today", hours_ago(2));
        with_summary.summary = Some("Solana validators upgrade".to_string());
        let source = MockFeedSource::new(
            "CoinDesk",
            vec![item_at("SOLANA rallies", hours_ago(1)), with_summary, item_at("Bitcoin", hours_ago(1))],
        );
        let agg = aggregator(vec![Arc::new(source)]);

        let entries = agg.fetch(Some(" solana "), DAY, 10).await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.title != "Bitcoin"));
    }

    #[tokio::test]
    async fn keyword_appends_search_hits() {
        let source = MockFeedSource::new("CoinDesk", vec![item_at("ETF news", hours_ago(2))]);
        let search = MockSearchProvider::new(
            "brave",
            vec![SearchHit {
                title: "ETF inflow record".to_string(),
                url: "https://search.example/1".to_string(),
                snippet: None,
                published: Some(hours_ago(1)),
            }],
        );
        let agg = aggregator(vec![Arc::new(source)]).with_search(Arc::new(search), 5);

        let entries = agg.fetch(Some("etf"), DAY, 10).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source_name, "brave");

        // Without a keyword the search provider is not consulted
        assert_eq!(agg.fetch(None, DAY, 10).await.len(), 1);
    }

    #[tokio::test]
    async fn search_failure_is_ignored() {
        let source = MockFeedSource::new("CoinDesk", vec![item_at("ETF news", hours_ago(2))]);
        let agg = aggregator(vec![Arc::new(source)])
            .with_search(Arc::new(MockSearchProvider::failing("serper")), 5);
        assert_eq!(agg.fetch(Some("etf"), DAY, 10).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicates_keep_most_recent() {
        let source = MockFeedSource::new(
            "CoinDesk",
            vec![item_at("ETF Approved", hours_ago(6)), item_at("ETF Approved", hours_ago(1))],
        );
        let agg = aggregator(vec![Arc::new(source)]);

        let entries = agg.fetch(None, DAY, 10).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].published_at > hours_ago(2));
    }

    #[tokio::test]
    async fn digest_reports_bias_and_alerts() {
        let source = MockFeedSource::new(
            "CoinDesk",
            vec![
                item_at("Exchange hack drains hot wallet", hours_ago(1)),
                item_at("Bitcoin rally continues", hours_ago(2)),
                item_at("Quiet day", hours_ago(3)),
            ],
        );
        let agg = aggregator(vec![Arc::new(source)]);

        let digest = agg.digest(None, DAY, 10).await;
        assert_eq!(digest.count, 3);
        assert_eq!(digest.alerts.len(), 1);
        assert_eq!(digest.alerts[0].matched, vec!["hack".to_string()]);
        assert!((-1.0..=1.0).contains(&digest.bias));
        assert!(digest.items[1].sentiment_score > 0.0);
    }

    #[tokio::test]
    async fn headlines_respect_limit() {
        let items = (0..3)
            .map(|i| item_at(&format!("story {i}"), hours_ago(i + 1)))
            .collect();
        let agg = aggregator(vec![Arc::new(MockFeedSource::new("CoinDesk", items))]);

        let lines = agg.headlines(2).await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("UTC - story 0 (https://"));
    }

    #[tokio::test]
    async fn headlines_ignore_recency_window() {
        let source = MockFeedSource::new(
            "CoinDesk",
            vec![
                item_at("Last week's recap", hours_ago(24 * 7)),
                item_at("Older archive piece", hours_ago(24 * 30)),
            ],
        );
        let agg = aggregator(vec![Arc::new(source)]);

        assert!(agg.fetch(None, agg.default_since(), 10).await.is_empty());
        let lines = agg.headlines(10).await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Last week's recap"));
    }

    #[test]
    fn limit_is_defaulted_and_capped() {
        let agg = aggregator(vec![]);
        assert_eq!(agg.clamp_limit(None), 6);
        assert_eq!(agg.clamp_limit(Some(3)), 3);
        assert_eq!(agg.clamp_limit(Some(500)), 50);
    }
}
