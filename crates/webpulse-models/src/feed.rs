use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry as read from a syndication feed or a search provider, before
/// timestamp resolution and scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Published time, else updated time, else `now`.
    ///
    /// Undated entries therefore look fresh; callers rely on that.
    pub fn resolve_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.published.or(self.updated).unwrap_or(now)
    }
}

/// A normalised, scored news entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedEntry {
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    /// Keyword heuristic in [-1, 1].
    pub sentiment_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl FeedEntry {
    /// Text used for keyword filtering and scoring.
    pub fn searchable_text(&self) -> String {
        match &self.summary {
            Some(summary) => format!("{} {}", self.title, summary),
            None => self.title.clone(),
        }
    }

    /// One-line rendering used by the headline endpoints.
    pub fn headline(&self) -> String {
        format!(
            "{} - {} ({})",
            self.published_at.format("%Y-%m-%d %H:%M UTC"),
            self.title,
            self.url
        )
    }
}

/// A feed entry that matched one or more high-severity keywords.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(flatten)]
    pub entry: FeedEntry,
    pub matched: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsDigest {
    pub count: usize,
    /// Mean sentiment score of `items`, 0 when empty.
    pub bias: f64,
    pub items: Vec<FeedEntry>,
    pub alerts: Vec<Alert>,
}

impl NewsDigest {
    pub fn new(items: Vec<FeedEntry>, alerts: Vec<Alert>) -> Self {
        let bias = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|e| e.sentiment_score).sum::<f64>() / items.len() as f64
        };
        Self {
            count: items.len(),
            bias,
            items,
            alerts,
        }
    }
}
