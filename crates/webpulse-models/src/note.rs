use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tables of the note log.
///
/// `notes` is append-only. `commands` holds a single `latest` row that the
/// command relay overwrites.
pub const NOTE_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS notes (
    id          TEXT PRIMARY KEY,
    path        TEXT NOT NULL,
    text        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at);
CREATE TABLE IF NOT EXISTS commands (
    slot          TEXT PRIMARY KEY,
    text          TEXT NOT NULL,
    timestamp_ms  INTEGER NOT NULL
);
";

/// A stored note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteRecord {
    pub id: Uuid,
    /// Display path, e.g. `notes/20240305_140700.txt`.
    pub path: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl NoteRecord {
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: note_path(created_at),
            text: text.into(),
            created_at,
        }
    }
}

pub fn note_path(at: DateTime<Utc>) -> String {
    format!("notes/{}.txt", at.format("%Y%m%d_%H%M%S"))
}
