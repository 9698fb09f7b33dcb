//! Hand-written mocks of the provider traits.
//!
//! Every mock is deterministic and counts its calls, so tests can assert
//! which tiers or sources were actually consulted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use webpulse_models::{FeedItem, FeedsConfig, IndexReading, PriceSource, SearchHit, SentimentConfig};
use webpulse_providers::{
    FeedSource, NoteStore, PriceProvider, SearchProvider, SentimentIndex, SqliteNoteStore,
    TextCompleter, UpstreamError,
};

use crate::aggregator::FeedAggregator;
use crate::resolver::PriceResolver;
use crate::sentiment::SentimentScorer;
use crate::services::BridgeServices;

/// A price tier returning a fixed price or a fixed failure.
pub struct MockPriceProvider {
    source: PriceSource,
    result: Result<f64, String>,
    covers: Option<Vec<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockPriceProvider {
    pub fn new(source: PriceSource, price: f64) -> Self {
        Self {
            source,
            result: Ok(price),
            covers: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn binance(price: f64) -> Self {
        Self::new(PriceSource::Binance, price)
    }

    pub fn coinpaprika(price: f64) -> Self {
        Self::new(PriceSource::Coinpaprika, price)
    }

    pub fn coingecko(price: f64) -> Self {
        Self::new(PriceSource::Coingecko, price)
    }

    pub fn failing(source: PriceSource, message: &str) -> Self {
        let mut mock = Self::new(source, 0.0);
        mock.result = Err(message.to_string());
        mock
    }

    /// Restrict the assets this tier maps; others are skipped.
    pub fn covering(mut self, bases: &[&str]) -> Self {
        self.covers = Some(bases.iter().map(|b| b.to_string()).collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    fn source(&self) -> PriceSource {
        self.source
    }

    fn instrument(&self, base: &str) -> Option<String> {
        if let Some(covers) = &self.covers {
            if !covers.iter().any(|c| c == base) {
                return None;
            }
        }
        Some(match self.source {
            PriceSource::Binance => format!("{base}USDT"),
            _ => base.to_lowercase(),
        })
    }

    fn quote_symbol(&self, base: &str) -> String {
        match self.source {
            PriceSource::Binance => format!("{base}USDT"),
            _ => format!("{base}USD"),
        }
    }

    async fn fetch_price(&self, _instrument: &str) -> Result<f64, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone().map_err(|body| UpstreamError::Status {
            provider: self.source.to_string(),
            status: 400,
            body,
        })
    }
}

/// A feed item with a title, a derived URL and a published time.
pub fn item_at(title: &str, published: DateTime<Utc>) -> FeedItem {
    FeedItem {
        title: title.to_string(),
        url: format!(
            "https://news.example/{}",
            title.to_lowercase().replace(' ', "-")
        ),
        summary: None,
        published: Some(published),
        updated: None,
    }
}

/// A feed returning canned items, or failing.
pub struct MockFeedSource {
    name: String,
    items: Vec<FeedItem>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockFeedSource {
    pub fn new(name: &str, items: Vec<FeedItem>) -> Self {
        Self {
            name: name.to_string(),
            items,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        let mut mock = Self::new(name, vec![]);
        mock.fail = true;
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_items(&self) -> Result<Vec<FeedItem>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(UpstreamError::Feed(format!("{}: mock failure", self.name)));
        }
        Ok(self.items.clone())
    }
}

pub struct MockSearchProvider {
    engine: String,
    hits: Vec<SearchHit>,
    fail: bool,
}

impl MockSearchProvider {
    pub fn new(engine: &str, hits: Vec<SearchHit>) -> Self {
        Self {
            engine: engine.to_string(),
            hits,
            fail: false,
        }
    }

    pub fn failing(engine: &str) -> Self {
        let mut mock = Self::new(engine, vec![]);
        mock.fail = true;
        mock
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn engine(&self) -> &str {
        &self.engine
    }

    async fn search(&self, _query: &str, count: usize) -> Result<Vec<SearchHit>, UpstreamError> {
        if self.fail {
            return Err(UpstreamError::Status {
                provider: self.engine.clone(),
                status: 401,
                body: "invalid key".to_string(),
            });
        }
        Ok(self.hits.iter().take(count).cloned().collect())
    }
}

pub struct MockIndex {
    reading: Option<IndexReading>,
}

impl MockIndex {
    /// Reads `72 (Greed)`.
    pub fn new() -> Self {
        Self {
            reading: Some(IndexReading {
                value: Some("72".to_string()),
                classification: Some("Greed".to_string()),
                timestamp: Some("1709596800".to_string()),
            }),
        }
    }

    pub fn failing() -> Self {
        Self { reading: None }
    }
}

impl Default for MockIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentIndex for MockIndex {
    async fn reading(&self) -> Result<IndexReading, UpstreamError> {
        self.reading
            .clone()
            .ok_or_else(|| UpstreamError::Decode("fear_greed: empty data".to_string()))
    }
}

pub struct MockCompleter {
    fail: bool,
}

impl MockCompleter {
    /// Answers `echo: {prompt}`.
    pub fn echo() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl TextCompleter for MockCompleter {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        if self.fail {
            return Err(UpstreamError::Timeout("openai".to_string(), 60));
        }
        Ok(format!("echo: {prompt}"))
    }
}

/// Services backed entirely by mocks:
///
/// - Binance quotes every asset at 65000.12, Coinpaprika at 64990.0.
/// - One `CoinDesk` feed with two recent entries, one of them an alert.
/// - A `brave` search provider with two hits.
/// - Fear & Greed reads `72 (Greed)`.
/// - No completer, an in-memory note log.
pub fn mock_services() -> BridgeServices {
    let now = Utc::now();
    let tiers: Vec<Arc<dyn PriceProvider>> = vec![
        Arc::new(MockPriceProvider::binance(65000.12)),
        Arc::new(MockPriceProvider::coinpaprika(64990.0)),
    ];

    let search: Arc<dyn SearchProvider> = Arc::new(MockSearchProvider::new(
        "brave",
        vec![
            SearchHit {
                title: "Bitcoin ETF flows".to_string(),
                url: "https://search.example/etf".to_string(),
                snippet: Some("Spot bitcoin ETF inflows".to_string()),
                published: Some(now - ChronoDuration::minutes(30)),
            },
            SearchHit {
                title: "Solana upgrade".to_string(),
                url: "https://search.example/sol".to_string(),
                snippet: None,
                published: None,
            },
        ],
    ));

    let feed = MockFeedSource::new(
        "CoinDesk",
        vec![
            item_at("Bitcoin ETF inflows hit record", now - ChronoDuration::hours(1)),
            item_at("Exchange hack halts withdrawals", now - ChronoDuration::hours(2)),
        ],
    );
    let aggregator = FeedAggregator::new(
        vec![Arc::new(feed)],
        Arc::new(SentimentScorer::from_config(&SentimentConfig::default())),
        &FeedsConfig::default(),
    )
    .with_search(Arc::clone(&search), 5);

    BridgeServices {
        resolver: PriceResolver::new(tiers, Duration::from_secs(1)),
        aggregator,
        search: Some(search),
        index: Arc::new(MockIndex::new()),
        completer: None,
        notes: SqliteNoteStore::open_in_memory()
            .ok()
            .map(|store| Arc::new(store) as Arc<dyn NoteStore>),
        search_count: 5,
    }
}
