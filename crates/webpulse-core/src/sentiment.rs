use webpulse_models::SentimentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Bullish,
    Bearish,
}

/// Keyword-count sentiment heuristic in [-1, 1], plus alert keyword matching.
///
/// Uncalibrated. Matching is case-insensitive substring matching, so `gain`
/// also fires inside `against`.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    /// Longest first, so the first hit at a position is the longest one.
    keywords: Vec<(String, Polarity)>,
    alerts: Vec<String>,
}

impl SentimentScorer {
    pub fn new(bullish: &[String], bearish: &[String], alerts: &[String]) -> Self {
        let bullish = normalize_keywords(bullish);
        let bearish = normalize_keywords(bearish);

        // A keyword in both sets carries no signal.
        let mut keywords: Vec<(String, Polarity)> = bullish
            .iter()
            .filter(|k| !bearish.contains(k))
            .map(|k| (k.clone(), Polarity::Bullish))
            .chain(
                bearish
                    .iter()
                    .filter(|k| !bullish.contains(k))
                    .map(|k| (k.clone(), Polarity::Bearish)),
            )
            .collect();
        keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            keywords,
            alerts: normalize_keywords(alerts),
        }
    }

    pub fn from_config(config: &SentimentConfig) -> Self {
        Self::new(&config.bullish, &config.bearish, &config.alerts)
    }

    /// `clamp((bullish - bearish) / 3, -1, 1)`. Empty text scores 0.
    pub fn score(&self, text: &str) -> f64 {
        let (bullish, bearish) = self.count(text);
        ((bullish as f64 - bearish as f64) / 3.0).clamp(-1.0, 1.0)
    }

    /// Configured alert keywords found in the text, in configuration order.
    pub fn alert_matches(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.alerts
            .iter()
            .filter(|alert| text.contains(alert.as_str()))
            .cloned()
            .collect()
    }

    /// Single left-to-right scan. Each occurrence counts once, and the scan
    /// resumes after the matched keyword.
    fn count(&self, text: &str) -> (usize, usize) {
        let text = text.to_lowercase();
        let (mut bullish, mut bearish) = (0, 0);
        let mut pos = 0;

        while let Some(rest) = text.get(pos..).filter(|r| !r.is_empty()) {
            let hit = self
                .keywords
                .iter()
                .find(|(keyword, _)| rest.starts_with(keyword.as_str()));
            if let Some((keyword, polarity)) = hit {
                match polarity {
                    Polarity::Bullish => bullish += 1,
                    Polarity::Bearish => bearish += 1,
                }
                pos += keyword.len();
                continue;
            }
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }

        (bullish, bearish)
    }
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    out
}
