use async_trait::async_trait;
use serde_json::Value;
use webpulse_models::IndexReading;

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// An external market sentiment index. Mockable for testing.
#[async_trait]
pub trait SentimentIndex: Send + Sync {
    async fn reading(&self) -> Result<IndexReading, UpstreamError>;
}

/// alternative.me Crypto Fear & Greed index.
pub struct FearGreedIndex {
    client: UpstreamClient,
    url: String,
}

impl FearGreedIndex {
    pub fn new(client: UpstreamClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SentimentIndex for FearGreedIndex {
    async fn reading(&self) -> Result<IndexReading, UpstreamError> {
        let body: Value = self
            .client
            .get_json(
                "fear_greed",
                &self.url,
                &[("limit", "1"), ("format", "json")],
                &[],
            )
            .await?;
        parse_fear_greed(&body)
    }
}

/// `{"data": [{"value": "54", "value_classification": "Neutral", "timestamp": "1709596800"}]}`
pub fn parse_fear_greed(body: &Value) -> Result<IndexReading, UpstreamError> {
    let latest = body
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| UpstreamError::Decode("fear_greed: empty data".to_string()))?;

    let text = |key: &str| {
        latest.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    Ok(IndexReading {
        value: text("value"),
        classification: text("value_classification"),
        timestamp: text("timestamp"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_data_point_is_used() {
        let body = json!({
            "name": "Fear and Greed Index",
            "data": [
                {"value": "72", "value_classification": "Greed", "timestamp": "1709596800"},
                {"value": "40", "value_classification": "Fear", "timestamp": "1709510400"}
            ]
        });
        let reading = parse_fear_greed(&body).unwrap();
        assert_eq!(reading.value.as_deref(), Some("72"));
        assert_eq!(reading.classification.as_deref(), Some("Greed"));
        assert_eq!(reading.timestamp.as_deref(), Some("1709596800"));
    }

    #[test]
    fn numeric_value_is_kept_as_text() {
        let body = json!({"data": [{"value": 12, "value_classification": "Extreme Fear"}]});
        let reading = parse_fear_greed(&body).unwrap();
        assert_eq!(reading.value.as_deref(), Some("12"));
        assert!(reading.timestamp.is_none());
    }

    #[test]
    fn empty_data_is_decode_error() {
        assert!(matches!(
            parse_fear_greed(&json!({"data": []})),
            Err(UpstreamError::Decode(_))
        ));
        assert!(parse_fear_greed(&json!({"metadata": {"error": "x"}})).is_err());
    }
}
