use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single web search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

/// Response of the web search endpoint. Errors are carried in-band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SearchOutcome {
    Results {
        engine: String,
        query: String,
        results: Vec<SearchHit>,
    },
    Error {
        error: String,
    },
}
