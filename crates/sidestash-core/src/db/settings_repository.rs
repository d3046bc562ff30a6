//! Settings repository implementation

use crate::db::Database;
use crate::error::Result;
use crate::util::now_ms;
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Trait for the flat key → JSON settings store
pub trait SettingsRepository {
    /// Read a setting, falling back to `default` when the key is absent or
    /// its stored value no longer decodes as `T`
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T>;

    /// Upsert a setting, JSON-encoding the value
    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;

    /// All settings that decode as JSON; undecodable rows are logged and
    /// skipped, never fatal
    fn all(&self) -> Result<BTreeMap<String, serde_json::Value>>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository over the given store handle
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        let raw: Option<String> = self
            .db
            .connection()
            .query_row("SELECT value FROM settings WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some(raw) = raw else {
            return Ok(default);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!("Setting '{key}' has undecodable value, using default: {err}");
                Ok(default)
            }
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        let now = now_ms();
        self.db.connection().execute(
            "INSERT INTO settings (key, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![key, encoded, now],
        )?;
        tracing::debug!("Setting saved: {key}");
        Ok(())
    }

    fn all(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = BTreeMap::new();
        for row in rows {
            let (key, raw) = row?;
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    settings.insert(key, value);
                }
                Err(err) => {
                    tracing::warn!("Skipping undecodable setting '{key}': {err}");
                }
            }
        }
        Ok(settings)
    }
}
