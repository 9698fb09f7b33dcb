use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;
use webpulse_models::note::NOTE_TABLE_DDL;
use webpulse_models::NoteRecord;

use crate::error::UpstreamError;

/// Persistent note log plus the latest relayed command.
pub trait NoteStore: Send + Sync {
    fn append(&self, text: &str) -> Result<NoteRecord, UpstreamError>;

    /// Most recent notes first.
    fn recent(&self, limit: usize) -> Result<Vec<NoteRecord>, UpstreamError>;

    /// Overwrite the `latest` command slot. Returns the stored timestamp in
    /// milliseconds since the epoch.
    fn record_command(&self, text: &str) -> Result<i64, UpstreamError>;
}

/// Single-file SQLite note log.
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
}

impl SqliteNoteStore {
    /// Open (or create) the database file and its schema.
    pub fn open(path: &str) -> Result<Self, UpstreamError> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| UpstreamError::Unavailable(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(NOTE_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self, UpstreamError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(NOTE_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self) -> Result<usize, UpstreamError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// The last relayed command and its timestamp, if any.
    pub fn latest_command(&self) -> Result<Option<(String, i64)>, UpstreamError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT text, timestamp_ms FROM commands WHERE slot = 'latest'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, UpstreamError> {
        self.conn
            .lock()
            .map_err(|_| UpstreamError::Unavailable("note store lock poisoned".to_string()))
    }
}

impl NoteStore for SqliteNoteStore {
    fn append(&self, text: &str) -> Result<NoteRecord, UpstreamError> {
        let record = NoteRecord::new(text, Utc::now());
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (id, path, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.id.to_string(),
                record.path,
                record.text,
                record.created_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(path = %record.path, "Note appended");
        Ok(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<NoteRecord>, UpstreamError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, path, text, created_at FROM notes \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, path, text, created_at)| {
                Ok(NoteRecord {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| UpstreamError::Decode(format!("note id {id}: {e}")))?,
                    path,
                    text,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| UpstreamError::Decode(format!("note time {created_at}: {e}")))?
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    fn record_command(&self, text: &str) -> Result<i64, UpstreamError> {
        let timestamp_ms = Utc::now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO commands (slot, text, timestamp_ms) VALUES ('latest', ?1, ?2) \
             ON CONFLICT(slot) DO UPDATE SET text = excluded.text, timestamp_ms = excluded.timestamp_ms",
            rusqlite::params![text, timestamp_ms],
        )?;
        Ok(timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_recent() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let first = store.append("buy the dip").unwrap();
        let second = store.append("take profit").unwrap();

        assert!(first.path.starts_with("notes/"));
        assert!(first.path.ends_with(".txt"));
        assert_eq!(store.count().unwrap(), 2);

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].text, "buy the dip");
    }

    #[test]
    fn recent_respects_limit() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.append(&format!("note {i}")).unwrap();
        }
        assert_eq!(store.recent(2).unwrap().len(), 2);
        assert!(store.recent(0).unwrap().is_empty());
    }

    #[test]
    fn command_slot_is_overwritten() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        assert!(store.latest_command().unwrap().is_none());

        store.record_command("open long").unwrap();
        let ts = store.record_command("close all").unwrap();

        let (text, stored_ts) = store.latest_command().unwrap().unwrap();
        assert_eq!(text, "close all");
        assert_eq!(stored_ts, ts);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("notes.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteNoteStore::open(path).unwrap();
            store.append("persisted").unwrap();
        }

        let store = SqliteNoteStore::open(path).unwrap();
        let notes = store.recent(5).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "persisted");
    }
}
