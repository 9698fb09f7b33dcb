use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use webpulse_models::{PriceConfig, PriceSource};

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// One tier of the price fallback chain. Mockable for testing.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn source(&self) -> PriceSource;

    /// Provider-specific instrument for a base asset (a trading pair or a
    /// coin id). `None` means the tier does not cover the asset and is skipped.
    fn instrument(&self, base: &str) -> Option<String>;

    /// Symbol reported in a quote from this tier.
    fn quote_symbol(&self, base: &str) -> String;

    /// Fetch the raw USD(T) price for an instrument.
    async fn fetch_price(&self, instrument: &str) -> Result<f64, UpstreamError>;
}

/// Build the tier list in priority order. CoinGecko is only included when an
/// API key is configured.
pub fn price_tiers(client: &UpstreamClient, config: &PriceConfig) -> Vec<Arc<dyn PriceProvider>> {
    let mut tiers: Vec<Arc<dyn PriceProvider>> = vec![
        Arc::new(BinanceProvider::new(
            client.clone(),
            &config.binance_base_url,
        )),
        Arc::new(CoinpaprikaProvider::new(
            client.clone(),
            &config.coinpaprika_base_url,
            config.coinpaprika_ids.clone(),
        )),
    ];

    if let Some(key) = config.coingecko_api_key.as_ref().filter(|k| !k.is_empty()) {
        tiers.push(Arc::new(CoingeckoProvider::new(
            client.clone(),
            &config.coingecko_base_url,
            key.clone(),
            config.coingecko_ids.clone(),
        )));
    }

    tiers
}

/// Binance spot ticker, queried with `{BASE}USDT`.
pub struct BinanceProvider {
    client: UpstreamClient,
    base_url: String,
}

impl BinanceProvider {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceProvider for BinanceProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Binance
    }

    fn instrument(&self, base: &str) -> Option<String> {
        (!base.is_empty()).then(|| format!("{base}USDT"))
    }

    fn quote_symbol(&self, base: &str) -> String {
        format!("{base}USDT")
    }

    async fn fetch_price(&self, instrument: &str) -> Result<f64, UpstreamError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let body: Value = self
            .client
            .get_json("binance", &url, &[("symbol", instrument)], &[])
            .await?;
        parse_binance_price(&body)
    }
}

/// Coinpaprika ticker, looked up by coin id.
pub struct CoinpaprikaProvider {
    client: UpstreamClient,
    base_url: String,
    ids: BTreeMap<String, String>,
}

impl CoinpaprikaProvider {
    pub fn new(client: UpstreamClient, base_url: &str, ids: BTreeMap<String, String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ids,
        }
    }
}

#[async_trait]
impl PriceProvider for CoinpaprikaProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Coinpaprika
    }

    fn instrument(&self, base: &str) -> Option<String> {
        self.ids.get(base).cloned()
    }

    fn quote_symbol(&self, base: &str) -> String {
        format!("{base}USD")
    }

    async fn fetch_price(&self, instrument: &str) -> Result<f64, UpstreamError> {
        let url = format!("{}/v1/tickers/{instrument}", self.base_url);
        let body: Value = self.client.get_json("coinpaprika", &url, &[], &[]).await?;
        parse_coinpaprika_price(&body)
    }
}

/// CoinGecko simple price endpoint (requires an API key).
pub struct CoingeckoProvider {
    client: UpstreamClient,
    base_url: String,
    api_key: String,
    ids: BTreeMap<String, String>,
}

impl CoingeckoProvider {
    pub fn new(
        client: UpstreamClient,
        base_url: &str,
        api_key: String,
        ids: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            ids,
        }
    }
}

#[async_trait]
impl PriceProvider for CoingeckoProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Coingecko
    }

    fn instrument(&self, base: &str) -> Option<String> {
        self.ids.get(base).cloned()
    }

    fn quote_symbol(&self, base: &str) -> String {
        format!("{base}USD")
    }

    async fn fetch_price(&self, instrument: &str) -> Result<f64, UpstreamError> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let body: Value = self
            .client
            .get_json(
                "coingecko",
                &url,
                &[("ids", instrument), ("vs_currencies", "usd")],
                &[("accept", "application/json"), ("x-cg-api-key", self.api_key.as_str())],
            )
            .await?;
        parse_coingecko_price(&body, instrument)
    }
}

/// `{"symbol": "BTCUSDT", "price": "65000.12000000"}`
pub fn parse_binance_price(body: &Value) -> Result<f64, UpstreamError> {
    number_field(body.get("price"), "binance price")
}

/// `{"quotes": {"USD": {"price": 65000.12}}}`
pub fn parse_coinpaprika_price(body: &Value) -> Result<f64, UpstreamError> {
    number_field(body.pointer("/quotes/USD/price"), "coinpaprika quotes.USD.price")
}

/// `{"bitcoin": {"usd": 65000.12}}`
pub fn parse_coingecko_price(body: &Value, coin_id: &str) -> Result<f64, UpstreamError> {
    number_field(
        body.get(coin_id).and_then(|c| c.get("usd")),
        &format!("coingecko {coin_id}.usd"),
    )
}

/// Accepts a JSON number or a numeric string. Finiteness is checked by the
/// caller when the quote is built.
fn number_field(value: Option<&Value>, what: &str) -> Result<f64, UpstreamError> {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| UpstreamError::Decode(format!("{what}: not representable as f64"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| UpstreamError::Decode(format!("{what}: {e}"))),
        Some(other) => Err(UpstreamError::Decode(format!(
            "{what}: unexpected value {other}"
        ))),
        None => Err(UpstreamError::Decode(format!("{what}: missing"))),
    }
}
