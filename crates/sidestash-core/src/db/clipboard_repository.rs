//! Clipboard history repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::db::{Database, SettingsRepository, SqliteSettingsRepository};
use crate::error::Result;
use crate::models::{ClipboardEntry, ItemId};
use crate::util::now_ms;
use rusqlite::{params, Row};

/// Fallback cap when the `max_history` setting is missing
const DEFAULT_MAX_HISTORY: usize = 20;

/// Trait for the bounded clipboard history
pub trait ClipboardRepository {
    /// Record a copy. Every insert is followed by a trim, so the table never
    /// holds more than the `max_history` setting allows.
    fn add(&self, item_id: Option<ItemId>, content: &str) -> Result<i64>;

    /// Recent entries, newest first, with the originating item's label and
    /// kind where that item still exists
    fn list(&self, limit: usize) -> Result<Vec<ClipboardEntry>>;

    /// Drop everything
    fn clear(&self) -> Result<()>;

    /// Keep only the most recent `keep_latest` entries
    fn trim(&self, keep_latest: usize) -> Result<()>;
}

/// `SQLite` implementation of `ClipboardRepository`
pub struct SqliteClipboardRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteClipboardRepository<'a> {
    /// Create a new repository over the given store handle
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_entry(row: &Row<'_>) -> rusqlite::Result<ClipboardEntry> {
        let kind: Option<String> = row.get(5)?;
        Ok(ClipboardEntry {
            id: row.get(0)?,
            item_id: row.get::<_, Option<i64>>(1)?.map(ItemId::new),
            content: row.get(2)?,
            copied_at: row.get(3)?,
            item_label: row.get(4)?,
            item_kind: kind.and_then(|raw| raw.parse().ok()),
        })
    }
}

impl ClipboardRepository for SqliteClipboardRepository<'_> {
    fn add(&self, item_id: Option<ItemId>, content: &str) -> Result<i64> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO clipboard_history (item_id, content, copied_at) VALUES (?1, ?2, ?3)",
            params![item_id.map(ItemId::as_i64), content, now_ms()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!("History entry added: ID {id}");

        let cap = SqliteSettingsRepository::new(self.db).get("max_history", DEFAULT_MAX_HISTORY)?;
        self.trim(cap)?;

        Ok(id)
    }

    fn list(&self, limit: usize) -> Result<Vec<ClipboardEntry>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT h.id, h.item_id, h.content, h.copied_at, i.label, i.type
             FROM clipboard_history h
             LEFT JOIN items i ON h.item_id = i.id
             ORDER BY h.copied_at DESC, h.id DESC
             LIMIT ?",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn clear(&self) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM clipboard_history", [])?;
        tracing::info!("Clipboard history cleared");
        Ok(())
    }

    fn trim(&self, keep_latest: usize) -> Result<()> {
        // id breaks ties between entries copied in the same millisecond
        self.db.connection().execute(
            "DELETE FROM clipboard_history
             WHERE id NOT IN (
                 SELECT id FROM clipboard_history
                 ORDER BY copied_at DESC, id DESC
                 LIMIT ?
             )",
            params![keep_latest as i64],
        )?;
        Ok(())
    }
}
