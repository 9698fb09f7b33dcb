use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use webpulse_models::{BridgeConfig, IndexOutcome, SearchOutcome};
use webpulse_providers::{
    feed_sources, price_tiers, search_provider, text_completer, FearGreedIndex, NoteStore,
    SearchProvider, SentimentIndex, SqliteNoteStore, TextCompleter, UpstreamClient, UpstreamError,
};

use crate::aggregator::FeedAggregator;
use crate::resolver::PriceResolver;
use crate::sentiment::SentimentScorer;

pub const NO_SEARCH_KEY: &str = "No web search key (BRAVE_API_KEY or SERPER_API_KEY)";
pub const NO_LLM: &str =
    "No LLM configured. Try: prix BTC, web: <query>, actu crypto, sentiment, memo: <text>.";

/// Everything a request handler or the command router can call.
///
/// Optional collaborators are `None` when their credential or path is not
/// configured.
pub struct BridgeServices {
    pub resolver: PriceResolver,
    pub aggregator: FeedAggregator,
    pub search: Option<Arc<dyn SearchProvider>>,
    pub index: Arc<dyn SentimentIndex>,
    pub completer: Option<Arc<dyn TextCompleter>>,
    pub notes: Option<Arc<dyn NoteStore>>,
    pub search_count: usize,
}

impl BridgeServices {
    /// Wire real providers from configuration.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, UpstreamError> {
        let client = UpstreamClient::new(&config.upstream)?;

        let resolver = PriceResolver::new(
            price_tiers(&client, &config.price),
            Duration::from_secs(config.price.tier_timeout_seconds),
        );

        let search = search_provider(&client, &config.search);
        let scorer = Arc::new(SentimentScorer::from_config(&config.sentiment));
        let mut aggregator =
            FeedAggregator::new(feed_sources(&client, &config.feeds), scorer, &config.feeds);
        if let Some(search) = &search {
            aggregator = aggregator.with_search(Arc::clone(search), config.search.result_count);
        }

        let notes = match config.notes.sqlite_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => {
                let store = SqliteNoteStore::open(path)?;
                info!(path, "Note log opened");
                Some(Arc::new(store) as Arc<dyn NoteStore>)
            }
            None => None,
        };

        Ok(Self {
            resolver,
            aggregator,
            search,
            index: Arc::new(FearGreedIndex::new(
                client.clone(),
                &config.sentiment.fear_greed_url,
            )),
            completer: text_completer(&client, &config.llm),
            notes,
            search_count: config.search.result_count,
        })
    }

    /// Run a web search. Failures are reported in-band.
    pub async fn web_search(&self, query: &str) -> SearchOutcome {
        let query = query.trim();
        let Some(search) = &self.search else {
            return SearchOutcome::Error {
                error: NO_SEARCH_KEY.to_string(),
            };
        };
        if query.is_empty() {
            return SearchOutcome::Error {
                error: "Empty query".to_string(),
            };
        }

        match search.search(query, self.search_count).await {
            Ok(results) => SearchOutcome::Results {
                engine: search.engine().to_string(),
                query: query.to_string(),
                results,
            },
            Err(e) => {
                warn!(engine = search.engine(), error = %e, "Web search failed");
                SearchOutcome::Error {
                    error: format!("{}: {e}", search.engine()),
                }
            }
        }
    }

    /// Current Fear & Greed reading. Failures are reported in-band.
    pub async fn sentiment_index(&self) -> IndexOutcome {
        match self.index.reading().await {
            Ok(reading) => IndexOutcome::Reading(reading),
            Err(e) => {
                warn!(error = %e, "Sentiment index failed");
                IndexOutcome::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Free-text answer. Never fails: without a completer, or on error, a
    /// fixed placeholder is returned.
    pub async fn complete(&self, prompt: &str) -> String {
        let Some(completer) = &self.completer else {
            return NO_LLM.to_string();
        };
        match completer.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model = completer.model(), error = %e, "Completion failed");
                format!("LLM unavailable ({e}).")
            }
        }
    }

    /// Run a note store call on the blocking pool, off the async workers.
    /// `None` when no note log is configured.
    pub async fn with_notes<T, F>(&self, op: F) -> Option<Result<T, UpstreamError>>
    where
        F: FnOnce(&dyn NoteStore) -> Result<T, UpstreamError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.notes.clone()?;
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .unwrap_or_else(|e| Err(UpstreamError::Unavailable(format!("note task failed: {e}"))));
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_services, MockCompleter, MockIndex, MockSearchProvider};

    #[tokio::test]
    async fn search_without_provider_reports_missing_key() {
        let mut services = mock_services();
        services.search = None;
        match services.web_search("btc").await {
            SearchOutcome::Error { error } => assert_eq!(error, NO_SEARCH_KEY),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_results_carry_engine_and_query() {
        let services = mock_services();
        match services.web_search("  bitcoin etf ").await {
            SearchOutcome::Results {
                engine,
                query,
                results,
            } => {
                assert_eq!(engine, "brave");
                assert_eq!(query, "bitcoin etf");
                assert!(!results.is_empty());
            }
            other => panic!("expected results, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_failure_names_engine() {
        let mut services = mock_services();
        services.search = Some(Arc::new(MockSearchProvider::failing("serper")));
        match services.web_search("x").await {
            SearchOutcome::Error { error } => assert!(error.starts_with("serper:")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn index_failure_is_in_band() {
        let mut services = mock_services();
        services.index = Arc::new(MockIndex::failing());
        assert!(matches!(
            services.sentiment_index().await,
            IndexOutcome::Error { .. }
        ));
    }

    #[tokio::test]
    async fn completion_placeholders() {
        let mut services = mock_services();
        assert_eq!(services.complete("hi").await, NO_LLM);

        services.completer = Some(Arc::new(MockCompleter::failing()));
        assert!(services.complete("hi").await.starts_with("LLM unavailable ("));

        services.completer = Some(Arc::new(MockCompleter::echo()));
        assert_eq!(services.complete("hi").await, "echo: hi");
    }

    #[test]
    fn from_default_config_wires_optional_parts_off() {
        let services = BridgeServices::from_config(&BridgeConfig::default()).unwrap();
        assert!(services.search.is_none());
        assert!(services.completer.is_none());
        assert!(services.notes.is_none());
    }

    #[tokio::test]
    async fn note_calls_run_off_the_async_workers() {
        let services = mock_services();
        let text = "rebalance Friday".to_string();
        let record = services
            .with_notes(move |store| store.append(&text))
            .await
            .unwrap()
            .unwrap();
        assert!(record.path.starts_with("notes/"));

        let recent = services.with_notes(|store| store.recent(5)).await.unwrap().unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].text, "rebalance Friday");
    }

    #[tokio::test]
    async fn note_calls_without_store_are_none() {
        let mut services = mock_services();
        services.notes = None;
        assert!(services.with_notes(|store| store.recent(5)).await.is_none());
    }
}
