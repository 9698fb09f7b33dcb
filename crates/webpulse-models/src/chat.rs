use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Internal tools a command can invoke, reported back in `tools_ran`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Price,
    WebSearch,
    RssCrypto,
    FearGreed,
    NoteLog,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub tools_ran: Vec<Tool>,
}

impl ChatReply {
    pub fn new(answer: impl Into<String>, tools_ran: Vec<Tool>) -> Self {
        Self {
            answer: answer.into(),
            tools_ran,
        }
    }

    /// A reply that ran no tool.
    pub fn plain(answer: impl Into<String>) -> Self {
        Self::new(answer, vec![])
    }
}
