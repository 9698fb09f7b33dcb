//! Integration tests for the price and news pipelines.
//!
//! Each test wires mock providers from `test_support` into the real
//! resolver, aggregator and router, then checks the serialized outcome the
//! HTTP layer would return.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use webpulse_core::test_support::{item_at, mock_services, MockFeedSource, MockPriceProvider};
use webpulse_core::{CommandRouter, FeedAggregator, PriceResolver, SentimentScorer};
use webpulse_models::{FeedsConfig, PriceSource, SentimentConfig, Tool};
use webpulse_providers::{FeedSource, PriceProvider};

#[tokio::test]
async fn resolve_then_route_price() {
    let services = Arc::new(mock_services());

    let outcome = services.resolver.resolve("BTC/USDT").await;
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"source": "binance", "symbol": "BTCUSDT", "price": 65000.12})
    );

    let router = CommandRouter::new(Arc::clone(&services));
    let reply = router.route("prix BTCUSDT", true).await.unwrap();
    assert_eq!(reply.answer, "BTCUSDT: 65000.1200 (src: binance)");
    assert_eq!(reply.tools_ran, vec![Tool::Price]);
}

#[tokio::test]
async fn exhausted_tiers_serialize_flat_diagnostics() {
    let binance = Arc::new(MockPriceProvider::failing(PriceSource::Binance, "Invalid symbol."));
    let paprika = Arc::new(MockPriceProvider::coinpaprika(1.0).covering(&["BTC", "ETH"]));
    let gecko = Arc::new(MockPriceProvider::coingecko(1.0).covering(&["BTC"]));
    let tiers: Vec<Arc<dyn PriceProvider>> = vec![binance.clone(), paprika.clone(), gecko.clone()];
    let resolver = PriceResolver::new(tiers, Duration::from_millis(500));

    let value = serde_json::to_value(resolver.resolve("xyz-usdt").await).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object["error"], "Price unavailable for xyz-usdt");
    assert!(object["binance_error"].as_str().unwrap().contains("Invalid symbol."));
    assert!(!object.contains_key("coinpaprika_error"));
    assert!(!object.contains_key("coingecko_error"));
    assert_eq!(object.len(), 2);

    assert_eq!(binance.calls(), 1);
    assert_eq!(paprika.calls(), 0);
    assert_eq!(gecko.calls(), 0);
}

#[tokio::test]
async fn news_digest_end_to_end() {
    let now = Utc::now();
    let coindesk = Arc::new(MockFeedSource::new(
        "CoinDesk",
        vec![
            item_at("ETF Approved", now - ChronoDuration::minutes(20)),
            item_at("Bitcoin surge extends rally", now - ChronoDuration::minutes(40)),
            item_at("ETF Approved", now - ChronoDuration::hours(3)),
            item_at("Ancient history", now - ChronoDuration::days(3)),
        ],
    ));
    let theblock = Arc::new(MockFeedSource::new(
        "The Block",
        vec![item_at("Protocol exploit drains pool", now - ChronoDuration::minutes(30))],
    ));
    let broken = Arc::new(MockFeedSource::failing("Reuters"));
    let sources: Vec<Arc<dyn FeedSource>> = vec![coindesk.clone(), theblock, broken.clone()];

    let aggregator = FeedAggregator::new(
        sources,
        Arc::new(SentimentScorer::from_config(&SentimentConfig::default())),
        &FeedsConfig::default(),
    );

    let digest = aggregator
        .digest(None, Duration::from_secs(24 * 3600), 10)
        .await;

    let titles: Vec<_> = digest.items.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["ETF Approved", "Protocol exploit drains pool", "Bitcoin surge extends rally"]
    );
    assert_eq!(digest.count, 3);
    assert_eq!(digest.alerts.len(), 1);
    assert_eq!(digest.alerts[0].entry.source_name, "The Block");
    assert!(digest.items.iter().all(|e| (-1.0..=1.0).contains(&e.sentiment_score)));

    let value = serde_json::to_value(&digest).unwrap();
    assert_eq!(value["alerts"][0]["matched"], json!(["exploit"]));
    assert_eq!(value["alerts"][0]["title"], "Protocol exploit drains pool");

    assert_eq!(coindesk.calls(), 1);
    assert_eq!(broken.calls(), 1);
}

#[tokio::test]
async fn every_command_is_rejected_without_authorization() {
    let router = CommandRouter::new(Arc::new(mock_services()));
    for command in ["prix BTC", "web: x", "actu crypto", "sentiment", "memo: x", "hi"] {
        assert!(router.route(command, false).await.is_err());
    }
}
