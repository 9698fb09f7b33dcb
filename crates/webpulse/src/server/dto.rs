use serde::{Deserialize, Serialize};
use webpulse_models::NoteRecord;

/// Default and maximum page size for `GET /notes`.
pub const DEFAULT_NOTES_LIMIT: usize = 20;
pub const MAX_NOTES_LIMIT: usize = 100;

// Requests

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub q: Option<String>,
    pub since_minutes: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub command: String,
}

// Responses

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub ok: bool,
    pub service: String,
}

/// Which optional collaborators are configured.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub ok: bool,
    pub notes: bool,
    pub search: bool,
    pub llm: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeadlinesResponse {
    pub top: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteSavedResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NoteSavedResponse {
    pub fn saved(path: String) -> Self {
        Self {
            ok: true,
            path: Some(path),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            path: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotesResponse {
    pub count: usize,
    pub notes: Vec<NoteRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
}
