use serde::{Deserialize, Serialize};

/// A reading of an external market sentiment index (Fear & Greed).
///
/// Values are kept as the provider's strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexReading {
    pub value: Option<String>,
    pub classification: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IndexOutcome {
    Reading(IndexReading),
    Error { error: String },
}
