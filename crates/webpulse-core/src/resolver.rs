use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use webpulse_models::{PriceError, PriceOutcome, Quote};
use webpulse_providers::{PriceProvider, UpstreamError};

/// Quote currencies stripped from a symbol to find the base asset, longest
/// first so `USDT` wins over `USD`.
const QUOTE_SUFFIXES: &[&str] = &["USDT", "USDC", "USD"];

/// Uppercase, drop separators, then strip one quote-currency suffix.
///
/// A suffix is only stripped when something remains, so `USDT` stays `USDT`.
pub fn normalize_symbol(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_' | ':') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    for suffix in QUOTE_SUFFIXES {
        if let Some(base) = compact.strip_suffix(suffix) {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    compact
}

/// Walks the price tiers in order and returns the first usable quote.
pub struct PriceResolver {
    tiers: Vec<Arc<dyn PriceProvider>>,
    tier_timeout: Duration,
}

impl PriceResolver {
    pub fn new(tiers: Vec<Arc<dyn PriceProvider>>, tier_timeout: Duration) -> Self {
        Self {
            tiers,
            tier_timeout,
        }
    }

    /// Resolve a symbol. Never fails hard: exhausting every tier yields a
    /// [`PriceError`] carrying one diagnostic per tier actually attempted.
    pub async fn resolve(&self, symbol: &str) -> PriceOutcome {
        let symbol = symbol.trim();
        let base = normalize_symbol(symbol);
        if base.is_empty() {
            return PriceOutcome::Error(PriceError::new("Missing symbol"));
        }

        let mut failure = PriceError::new(format!("Price unavailable for {symbol}"));

        for tier in &self.tiers {
            let source = tier.source();
            let Some(instrument) = tier.instrument(&base) else {
                debug!(symbol = %base, %source, "Tier does not cover asset, skipping");
                continue;
            };

            let start = Instant::now();
            let result = match tokio::time::timeout(self.tier_timeout, tier.fetch_price(&instrument)).await {
                Ok(result) => result,
                Err(_) => Err(UpstreamError::Timeout(
                    source.to_string(),
                    self.tier_timeout.as_secs(),
                )),
            };
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result.map(|price| Quote::new(source, tier.quote_symbol(&base), price)) {
                Ok(Ok(quote)) => {
                    info!(symbol = %quote.symbol(), %source, price = quote.price(), elapsed_ms, "Price resolved");
                    return PriceOutcome::Quote(quote);
                }
                Ok(Err(invalid)) => {
                    warn!(symbol = %base, %source, error = %invalid, elapsed_ms, "Tier returned unusable price");
                    failure.record(source, invalid.to_string());
                }
                Err(e) => {
                    warn!(symbol = %base, %source, error = %e, elapsed_ms, "Tier failed");
                    failure.record(source, e.to_string());
                }
            }
        }

        PriceOutcome::Error(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockPriceProvider;
    use webpulse_models::PriceSource;

    fn resolver(tiers: Vec<Arc<MockPriceProvider>>) -> PriceResolver {
        PriceResolver::new(
            tiers
                .into_iter()
                .map(|t| t as Arc<dyn PriceProvider>)
                .collect(),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn normalize_strips_separators_and_quote_currency() {
        assert_eq!(normalize_symbol("BTC/USDT"), "BTC");
        assert_eq!(normalize_symbol(" eth-usd "), "ETH");
        assert_eq!(normalize_symbol("sol_usdc"), "SOL");
        assert_eq!(normalize_symbol("BTC:USDT"), "BTC");
        assert_eq!(normalize_symbol("btcusdt"), "BTC");
        assert_eq!(normalize_symbol("doge"), "DOGE");
    }

    #[test]
    fn normalize_keeps_bare_quote_currency() {
        assert_eq!(normalize_symbol("USDT"), "USDT");
        assert_eq!(normalize_symbol("usd"), "USD");
        assert_eq!(normalize_symbol("/-_"), "");
    }

    #[tokio::test]
    async fn first_tier_wins_and_later_tiers_untouched() {
        let binance = Arc::new(MockPriceProvider::binance(65000.12));
        let paprika = Arc::new(MockPriceProvider::coinpaprika(64990.0));
        let r = resolver(vec![binance.clone(), paprika.clone()]);

        let outcome = r.resolve("BTC/USDT").await;
        let quote = outcome.quote().unwrap();
        assert_eq!(quote.source(), PriceSource::Binance);
        assert_eq!(quote.symbol(), "BTCUSDT");
        assert_eq!(quote.price(), 65000.12);

        assert_eq!(binance.calls(), 1);
        assert_eq!(paprika.calls(), 0);
    }

    #[tokio::test]
    async fn falls_through_to_next_tier() {
        let binance = Arc::new(MockPriceProvider::failing(PriceSource::Binance, "HTTP 400"));
        let paprika = Arc::new(MockPriceProvider::coinpaprika(64990.5));
        let r = resolver(vec![binance.clone(), paprika.clone()]);

        let quote = r.resolve("btc").await.quote().cloned().unwrap();
        assert_eq!(quote.source(), PriceSource::Coinpaprika);
        assert_eq!(quote.symbol(), "BTCUSD");
        assert_eq!(binance.calls(), 1);
        assert_eq!(paprika.calls(), 1);
    }

    #[tokio::test]
    async fn diagnostics_only_for_attempted_tiers() {
        let binance = Arc::new(MockPriceProvider::failing(PriceSource::Binance, "Invalid symbol"));
        // Coinpaprika has no id for this asset
        let paprika = Arc::new(MockPriceProvider::coinpaprika(1.0).covering(&["BTC"]));
        let gecko = Arc::new(MockPriceProvider::failing(PriceSource::Coingecko, "429"));
        let r = resolver(vec![binance, paprika.clone(), gecko]);

        let outcome = r.resolve("NOPE").await;
        let err = outcome.error().unwrap();
        assert_eq!(err.error, "Price unavailable for NOPE");
        assert!(err.diagnostic(PriceSource::Binance).unwrap().contains("Invalid symbol"));
        assert!(err.diagnostic(PriceSource::Coinpaprika).is_none());
        assert!(err.diagnostic(PriceSource::Coingecko).is_some());
        assert_eq!(err.diagnostics.len(), 2);
        assert_eq!(paprika.calls(), 0);
    }

    #[tokio::test]
    async fn unusable_price_is_a_tier_failure() {
        let binance = Arc::new(MockPriceProvider::binance(f64::NAN));
        let paprika = Arc::new(MockPriceProvider::coinpaprika(-3.0));
        let r = resolver(vec![binance, paprika]);

        let outcome = r.resolve("BTC").await;
        let err = outcome.error().unwrap();
        assert!(err.diagnostic(PriceSource::Binance).unwrap().contains("non-finite"));
        assert!(err.diagnostic(PriceSource::Coinpaprika).unwrap().contains("negative"));
    }

    #[tokio::test]
    async fn slow_tier_times_out() {
        let binance = Arc::new(MockPriceProvider::binance(1.0).with_delay(Duration::from_secs(5)));
        let paprika = Arc::new(MockPriceProvider::coinpaprika(2.0));
        let r = resolver(vec![binance.clone(), paprika]);

        let quote = r.resolve("BTC").await.quote().cloned().unwrap();
        assert_eq!(quote.source(), PriceSource::Coinpaprika);
        assert_eq!(binance.calls(), 1);
    }

    #[tokio::test]
    async fn empty_symbol_attempts_nothing() {
        let binance = Arc::new(MockPriceProvider::binance(1.0));
        let r = resolver(vec![binance.clone()]);

        let outcome = r.resolve("  ").await;
        let err = outcome.error().unwrap();
        assert!(err.diagnostics.is_empty());
        assert_eq!(binance.calls(), 0);
    }

    #[tokio::test]
    async fn zero_price_is_accepted() {
        let r = resolver(vec![Arc::new(MockPriceProvider::binance(0.0))]);
        assert_eq!(r.resolve("DEAD").await.quote().unwrap().price(), 0.0);
    }
}
