use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Price providers, in the order the resolver tries them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Binance,
    Coinpaprika,
    Coingecko,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Binance => "binance",
            PriceSource::Coinpaprika => "coinpaprika",
            PriceSource::Coingecko => "coingecko",
        }
    }

    /// Key used for this provider's diagnostic in a [`PriceError`].
    pub fn error_key(&self) -> String {
        format!("{}_error", self.as_str())
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw provider value could not become a [`Quote`].
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidPrice {
    NotFinite(f64),
    Negative(f64),
}

impl fmt::Display for InvalidPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidPrice::NotFinite(p) => write!(f, "non-finite price: {p}"),
            InvalidPrice::Negative(p) => write!(f, "negative price: {p}"),
        }
    }
}

impl std::error::Error for InvalidPrice {}

/// A spot price from one provider.
///
/// Fields are private so the price invariant (finite, non-negative) holds for
/// every constructed value.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Quote {
    source: PriceSource,
    symbol: String,
    price: f64,
}

impl Quote {
    pub fn new(
        source: PriceSource,
        symbol: impl Into<String>,
        price: f64,
    ) -> Result<Self, InvalidPrice> {
        if !price.is_finite() {
            return Err(InvalidPrice::NotFinite(price));
        }
        if price < 0.0 {
            return Err(InvalidPrice::Negative(price));
        }
        Ok(Self {
            source,
            symbol: symbol.into(),
            price,
        })
    }

    pub fn source(&self) -> PriceSource {
        self.source
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

/// Returned when every tier failed or was skipped.
///
/// Serialises as `{"error": "...", "binance_error": "...", ...}` with one
/// diagnostic key per tier that was actually attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceError {
    pub error: String,
    #[serde(flatten)]
    pub diagnostics: BTreeMap<String, String>,
}

impl PriceError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, source: PriceSource, message: impl Into<String>) {
        self.diagnostics.insert(source.error_key(), message.into());
    }

    pub fn diagnostic(&self, source: PriceSource) -> Option<&str> {
        self.diagnostics
            .get(&source.error_key())
            .map(|s| s.as_str())
    }
}

/// Result of a price lookup. Both shapes are returned with HTTP 200.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum PriceOutcome {
    Quote(Quote),
    Error(PriceError),
}

impl PriceOutcome {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            PriceOutcome::Quote(q) => Some(q),
            PriceOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PriceError> {
        match self {
            PriceOutcome::Quote(_) => None,
            PriceOutcome::Error(e) => Some(e),
        }
    }
}
