use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the bridge.
///
/// Every section is optional in the TOML file. Secrets are normally supplied
/// through the environment, see [`BridgeConfig::apply_env`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
    pub price: PriceConfig,
    pub feeds: FeedsConfig,
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub notes: NotesConfig,
    pub sentiment: SentimentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected in the `x-admin-token` header. When unset,
    /// every gated endpoint rejects.
    pub admin_token: Option<String>,
}

/// Settings for the shared outbound HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Hard timeout applied by the HTTP client to every request.
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: concat!("webpulse-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceConfig {
    pub binance_base_url: String,
    pub coinpaprika_base_url: String,
    pub coingecko_base_url: String,
    /// The CoinGecko tier is only wired in when a key is present.
    pub coingecko_api_key: Option<String>,
    /// Per-tier timebox, applied on top of the client timeout.
    pub tier_timeout_seconds: u64,
    /// Base asset -> Coinpaprika coin id.
    pub coinpaprika_ids: BTreeMap<String, String>,
    /// Base asset -> CoinGecko coin id.
    pub coingecko_ids: BTreeMap<String, String>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            binance_base_url: "https://api.binance.com".to_string(),
            coinpaprika_base_url: "https://api.coinpaprika.com".to_string(),
            coingecko_base_url: "https://api.coingecko.com".to_string(),
            coingecko_api_key: None,
            tier_timeout_seconds: 10,
            coinpaprika_ids: string_map(&[
                ("BTC", "btc-bitcoin"),
                ("ETH", "eth-ethereum"),
                ("BNB", "bnb-binance-coin"),
                ("XRP", "xrp-xrp"),
                ("SOL", "sol-solana"),
                ("ADA", "ada-cardano"),
                ("DOGE", "doge-dogecoin"),
                ("AVAX", "avax-avalanche"),
                ("DOT", "dot-polkadot"),
                ("MATIC", "matic-polygon"),
                ("TRX", "trx-tron"),
                ("LINK", "link-chainlink"),
                ("ATOM", "atom-cosmos"),
                ("OP", "op-optimism"),
                ("ARB", "arb-arbitrum"),
            ]),
            coingecko_ids: string_map(&[
                ("BTC", "bitcoin"),
                ("ETH", "ethereum"),
                ("BNB", "binancecoin"),
                ("XRP", "ripple"),
                ("SOL", "solana"),
            ]),
        }
    }
}

/// A syndication feed to aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSourceConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedsConfig {
    pub sources: Vec<FeedSourceConfig>,
    /// Maximum entries taken from each feed, in document order.
    pub per_source_limit: usize,
    pub source_timeout_seconds: u64,
    pub default_since_minutes: u64,
    pub default_limit: usize,
    /// Upper bound on a caller-supplied `limit`.
    pub max_limit: usize,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        let source = |name: &str, url: &str| FeedSourceConfig {
            name: name.to_string(),
            url: url.to_string(),
        };
        Self {
            sources: vec![
                source("CoinDesk", "https://www.coindesk.com/arc/outboundfeeds/rss/"),
                source("The Block", "https://www.theblock.co/rss.xml"),
                source("CryptoPotato", "https://cryptopotato.com/feed/"),
                source("Cointelegraph", "https://cointelegraph.com/rss"),
                source("Reuters", "https://www.reuters.com/markets/cryptocurrency/rss"),
            ],
            per_source_limit: 4,
            source_timeout_seconds: 15,
            default_since_minutes: 1440,
            default_limit: 6,
            max_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Preferred engine when set.
    pub brave_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub brave_url: String,
    pub serper_url: String,
    pub result_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            serper_api_key: None,
            brave_url: "https://api.search.brave.com/res/v1/web/search".to_string(),
            serper_url: "https://google.serper.dev/search".to_string(),
            result_count: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Free-text commands fall back to a placeholder when unset.
    pub openai_api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            timeout_seconds: 60,
            system_prompt: "Answer briefly and clearly.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NotesConfig {
    /// SQLite file for the note log. The log is disabled when unset.
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentConfig {
    pub fear_greed_url: String,
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
    /// High-severity keywords that turn a feed entry into an alert.
    pub alerts: Vec<String>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            fear_greed_url: "https://api.alternative.me/fng/".to_string(),
            bullish: string_vec(&[
                "surge",
                "soar",
                "rally",
                "bull",
                "record high",
                "all-time high",
                "approval",
                "approved",
                "adoption",
                "breakout",
                "inflow",
                "upgrade",
                "gain",
            ]),
            bearish: string_vec(&[
                "crash",
                "plunge",
                "slump",
                "bear",
                "selloff",
                "sell-off",
                "outflow",
                "lawsuit",
                "banned",
                "bans",
                "hack",
                "exploit",
                "liquidation",
                "drop",
            ]),
            alerts: string_vec(&[
                "hack",
                "exploit",
                "sec charges",
                "lawsuit",
                "enforcement action",
                "regulatory action",
                "delist",
                "halt",
            ]),
        }
    }
}

impl BridgeConfig {
    /// Overlay settings from an arbitrary lookup. Empty values count as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ADMIN_TOKEN") {
            self.auth.admin_token = Some(v);
        }
        if let Some(v) = get("BRAVE_API_KEY") {
            self.search.brave_api_key = Some(v);
        }
        if let Some(v) = get("SERPER_API_KEY") {
            self.search.serper_api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(v);
        }
        if let Some(v) = get("MODEL_NAME") {
            self.llm.model = v;
        }
        if let Some(v) = get("COINGECKO_API_KEY") {
            self.price.coingecko_api_key = Some(v);
        }
        if let Some(v) = get("NOTES_DB_PATH") {
            self.notes.sqlite_path = Some(v);
        }
        if let Some(port) = get("PORT") {
            self.server.bind_addr = replace_port(&self.server.bind_addr, port.trim());
        }
    }

    /// The configured shared secret, ignoring empty strings.
    pub fn admin_token(&self) -> Option<&str> {
        self.auth
            .admin_token
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

fn replace_port(bind_addr: &str, port: &str) -> String {
    match bind_addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{bind_addr}:{port}"),
    }
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn string_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
