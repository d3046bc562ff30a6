//! Repository for the embedded browser's flat stores: bookmarks, speed
//! dials, saved sessions, and storage profiles
//!
//! These tables have no relationships to the category/item hierarchy; they
//! share the store handle and the id/ordering conventions. Speed dial
//! positions are kept consecutive from 0: every delete or reorder ends
//! with a renumbering pass inside the same transaction.

#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
// SQLite uses i64 for positions and counts

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    Bookmark, BookmarkPatch, BrowserProfile, BrowserSession, NewSpeedDial, SessionTab, SpeedDial,
    SpeedDialPatch, TabDraft,
};
use crate::util::now_ms;
use rusqlite::{params, Connection, Row, ToSql};

const SESSION_COLUMNS: &str = "id, name, is_auto_save, created_at, updated_at, \
     (SELECT COUNT(*) FROM session_tabs WHERE session_id = browser_sessions.id)";

/// `SQLite` store for the browser surface
pub struct SqliteBrowserRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteBrowserRepository<'a> {
    /// Create a new repository over the given store handle
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_bookmark(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            folder: row.get(3)?,
            icon: row.get(4)?,
            order_index: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn parse_speed_dial(row: &Row<'_>) -> rusqlite::Result<SpeedDial> {
        Ok(SpeedDial {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            icon: row.get(3)?,
            background_color: row.get(4)?,
            thumbnail_path: row.get(5)?,
            position: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn parse_session(row: &Row<'_>) -> rusqlite::Result<BrowserSession> {
        Ok(BrowserSession {
            id: row.get(0)?,
            name: row.get(1)?,
            is_auto_save: row.get::<_, i64>(2)? != 0,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            tab_count: row.get(5)?,
        })
    }

    fn parse_profile(row: &Row<'_>) -> rusqlite::Result<BrowserProfile> {
        Ok(BrowserProfile {
            id: row.get(0)?,
            name: row.get(1)?,
            storage_path: row.get(2)?,
            is_default: row.get::<_, i64>(3)? != 0,
            created_at: row.get(4)?,
            last_used: row.get(5)?,
        })
    }

    /// Rewrite speed dial positions to 0, 1, 2, ... in their current order.
    /// Rows already in place are left untouched.
    fn renumber_speed_dials(conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare("SELECT id FROM speed_dials ORDER BY position, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (index, id) in ids.iter().enumerate() {
            conn.execute(
                "UPDATE speed_dials SET position = ?1 WHERE id = ?2 AND position != ?1",
                params![index as i64, id],
            )?;
        }
        Ok(())
    }

    /// Storage directory derived from the profile name: lowercased, with
    /// anything outside `[a-z0-9_-]` replaced by underscores
    fn derive_storage_path(name: &str) -> String {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("browser_data/{slug}")
    }

    // ----- bookmarks -----

    /// Save a page. Bookmarks are deduplicated by URL: saving one that
    /// already exists returns the existing id instead of inserting.
    pub fn add_bookmark(&self, title: &str, url: &str, folder: Option<&str>) -> Result<i64> {
        let conn = self.db.connection();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM bookmarks WHERE url = ?",
                params![url],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        if let Some(id) = existing {
            tracing::debug!("Bookmark already exists for {url} (ID: {id})");
            return Ok(id);
        }

        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(order_index), -1) + 1 FROM bookmarks",
            [],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO bookmarks (title, url, folder, order_index, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, url, folder, next_order, now_ms()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("Bookmark added: '{title}' - {url}");
        Ok(id)
    }

    /// All bookmarks, optionally restricted to one folder
    pub fn bookmarks(&self, folder: Option<&str>) -> Result<Vec<Bookmark>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT id, title, url, folder, icon, order_index, created_at
             FROM bookmarks
             WHERE ?1 IS NULL OR folder = ?1
             ORDER BY order_index, created_at DESC",
        )?;

        let bookmarks = stmt
            .query_map(params![folder], Self::parse_bookmark)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(bookmarks)
    }

    /// Apply a field-wise bookmark update
    pub fn update_bookmark(&self, id: i64, patch: BookmarkPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            args.push(title);
        }
        if let Some(url) = &patch.url {
            sets.push("url = ?");
            args.push(url);
        }
        if let Some(folder) = &patch.folder {
            sets.push("folder = ?");
            args.push(folder);
        }
        if let Some(icon) = &patch.icon {
            sets.push("icon = ?");
            args.push(icon);
        }
        args.push(&id);

        let sql = format!("UPDATE bookmarks SET {} WHERE id = ?", sets.join(", "));
        let rows = self.db.connection().execute(&sql, &args[..])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("bookmark {id}")));
        }
        tracing::debug!("Bookmark updated: ID {id}");
        Ok(())
    }

    /// Remove a bookmark
    pub fn delete_bookmark(&self, id: i64) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM bookmarks WHERE id = ?", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("bookmark {id}")));
        }
        tracing::info!("Bookmark deleted: ID {id}");
        Ok(())
    }

    /// Whether a bookmark with this URL already exists
    pub fn bookmark_exists(&self, url: &str) -> Result<bool> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE url = ?",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ----- speed dials -----

    /// Add a tile at the end of the grid
    pub fn add_speed_dial(&self, draft: NewSpeedDial) -> Result<i64> {
        let conn = self.db.connection();
        let next_position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM speed_dials",
            [],
            |row| row.get(0),
        )?;

        let now = now_ms();
        conn.execute(
            "INSERT INTO speed_dials
             (title, url, icon, background_color, thumbnail_path, position, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                draft.title,
                draft.url,
                draft.icon,
                draft.background_color,
                draft.thumbnail_path,
                next_position,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("Speed dial added: '{}' - {}", draft.title, draft.url);
        Ok(id)
    }

    /// All tiles in grid order
    pub fn speed_dials(&self) -> Result<Vec<SpeedDial>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT id, title, url, icon, background_color, thumbnail_path,
                    position, created_at, updated_at
             FROM speed_dials
             ORDER BY position",
        )?;

        let dials = stmt
            .query_map([], Self::parse_speed_dial)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(dials)
    }

    /// Apply a field-wise speed dial update
    pub fn update_speed_dial(&self, id: i64, patch: SpeedDialPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            args.push(title);
        }
        if let Some(url) = &patch.url {
            sets.push("url = ?");
            args.push(url);
        }
        if let Some(icon) = &patch.icon {
            sets.push("icon = ?");
            args.push(icon);
        }
        if let Some(background_color) = &patch.background_color {
            sets.push("background_color = ?");
            args.push(background_color);
        }
        if let Some(thumbnail_path) = &patch.thumbnail_path {
            sets.push("thumbnail_path = ?");
            args.push(thumbnail_path);
        }

        let now = now_ms();
        sets.push("updated_at = ?");
        args.push(&now);
        args.push(&id);

        let sql = format!("UPDATE speed_dials SET {} WHERE id = ?", sets.join(", "));
        let rows = self.db.connection().execute(&sql, &args[..])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("speed dial {id}")));
        }
        tracing::debug!("Speed dial updated: ID {id}");
        Ok(())
    }

    /// Remove a tile and close the gap it leaves
    pub fn delete_speed_dial(&self, id: i64) -> Result<()> {
        self.db.with_transaction(|conn| {
            let rows = conn.execute("DELETE FROM speed_dials WHERE id = ?", params![id])?;
            if rows == 0 {
                return Err(Error::NotFound(format!("speed dial {id}")));
            }
            Self::renumber_speed_dials(conn)
        })?;
        tracing::info!("Speed dial deleted: ID {id}");
        Ok(())
    }

    /// Move a tile to a new 0-based position; the requested position is
    /// clamped into the grid and every tile ends up renumbered consecutively
    pub fn reorder_speed_dial(&self, id: i64, new_position: i64) -> Result<()> {
        self.db.with_transaction(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM speed_dials ORDER BY position, id")?;
            let mut ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let Some(current) = ids.iter().position(|&dial| dial == id) else {
                return Err(Error::NotFound(format!("speed dial {id}")));
            };
            let moved = ids.remove(current);
            let target = new_position.clamp(0, ids.len() as i64) as usize;
            ids.insert(target, moved);

            for (index, dial) in ids.iter().enumerate() {
                conn.execute(
                    "UPDATE speed_dials SET position = ?1 WHERE id = ?2 AND position != ?1",
                    params![index as i64, dial],
                )?;
            }
            Ok(())
        })?;
        tracing::debug!("Speed dial {id} moved to position {new_position}");
        Ok(())
    }

    // ----- sessions -----

    /// Persist a set of tabs under a session name, atomically. An auto-save
    /// session replaces any previous auto-save; manual saves accumulate.
    pub fn save_session(&self, name: &str, tabs: &[TabDraft], is_auto_save: bool) -> Result<i64> {
        let session_id = self.db.with_transaction(|conn| {
            if is_auto_save {
                conn.execute("DELETE FROM browser_sessions WHERE is_auto_save = 1", [])?;
            }

            let now = now_ms();
            conn.execute(
                "INSERT INTO browser_sessions (name, is_auto_save, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![name, is_auto_save, now],
            )?;
            let session_id = conn.last_insert_rowid();

            for tab in tabs {
                conn.execute(
                    "INSERT INTO session_tabs (session_id, url, title, position, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![session_id, tab.url, tab.title, tab.position, tab.is_active],
                )?;
            }
            Ok(session_id)
        })?;

        tracing::info!(
            "Session saved: {name} (ID: {session_id}) with {} tabs",
            tabs.len()
        );
        Ok(session_id)
    }

    /// Saved sessions, newest first. Auto-saves are hidden unless asked for.
    pub fn sessions(&self, include_auto_save: bool) -> Result<Vec<BrowserSession>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM browser_sessions
             WHERE is_auto_save = 0 OR ?1 = 1
             ORDER BY created_at DESC, id DESC"
        ))?;

        let sessions = stmt
            .query_map(params![i64::from(include_auto_save)], Self::parse_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    /// A session's tabs in display order
    pub fn session_tabs(&self, session_id: i64) -> Result<Vec<SessionTab>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT id, session_id, url, title, position, is_active
             FROM session_tabs
             WHERE session_id = ?
             ORDER BY position",
        )?;

        let tabs = stmt
            .query_map(params![session_id], |row| {
                Ok(SessionTab {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    url: row.get(2)?,
                    title: row.get(3)?,
                    position: row.get(4)?,
                    is_active: row.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tabs)
    }

    /// The most recent auto-save session, if any
    pub fn last_auto_save_session(&self) -> Result<Option<BrowserSession>> {
        let result = self.db.connection().query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM browser_sessions
                 WHERE is_auto_save = 1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1"
            ),
            [],
            Self::parse_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Rename a saved session
    pub fn rename_session(&self, id: i64, new_name: &str) -> Result<()> {
        let rows = self.db.connection().execute(
            "UPDATE browser_sessions SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_name, now_ms(), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("session {id}")));
        }
        tracing::info!("Session {id} renamed to: {new_name}");
        Ok(())
    }

    /// Delete a session; its tabs go with it through the schema cascade
    pub fn delete_session(&self, id: i64) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM browser_sessions WHERE id = ?", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("session {id}")));
        }
        tracing::info!("Session deleted: {id}");
        Ok(())
    }

    // ----- storage profiles -----

    /// Create an isolated storage profile. The storage directory is derived
    /// from the name when not given explicitly.
    pub fn add_profile(&self, name: &str, storage_path: Option<&str>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("profile name must not be empty".into()));
        }

        let conn = self.db.connection();
        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM browser_profiles WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::Constraint(format!("profile '{name}' already exists")));
        }

        let storage_path =
            storage_path.map_or_else(|| Self::derive_storage_path(name), str::to_string);
        let now = now_ms();
        conn.execute(
            "INSERT INTO browser_profiles (name, storage_path, is_default, created_at, last_used)
             VALUES (?1, ?2, 0, ?3, ?3)",
            params![name, storage_path, now],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("Browser profile created: '{name}' (ID: {id})");
        Ok(id)
    }

    /// All profiles, default first, then by recency of use
    pub fn profiles(&self) -> Result<Vec<BrowserProfile>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT id, name, storage_path, is_default, created_at, last_used
             FROM browser_profiles
             ORDER BY is_default DESC, last_used DESC",
        )?;

        let profiles = stmt
            .query_map([], Self::parse_profile)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(profiles)
    }

    /// Get a profile by ID
    pub fn profile(&self, id: i64) -> Result<Option<BrowserProfile>> {
        let result = self.db.connection().query_row(
            "SELECT id, name, storage_path, is_default, created_at, last_used
             FROM browser_profiles
             WHERE id = ?",
            params![id],
            Self::parse_profile,
        );

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The default profile. One is seeded by migration, so this only comes
    /// back empty on a database manipulated from outside.
    pub fn default_profile(&self) -> Result<Option<BrowserProfile>> {
        let result = self.db.connection().query_row(
            "SELECT id, name, storage_path, is_default, created_at, last_used
             FROM browser_profiles
             WHERE is_default = 1
             LIMIT 1",
            [],
            Self::parse_profile,
        );

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tracing::warn!("No default browser profile found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Make this profile the default, clearing the flag everywhere else
    pub fn set_default_profile(&self, id: i64) -> Result<()> {
        self.db.with_transaction(|conn| {
            conn.execute("UPDATE browser_profiles SET is_default = 0", [])?;
            let rows = conn.execute(
                "UPDATE browser_profiles SET is_default = 1 WHERE id = ?",
                params![id],
            )?;
            if rows == 0 {
                return Err(Error::NotFound(format!("profile {id}")));
            }
            Ok(())
        })?;
        tracing::info!("Profile {id} set as default");
        Ok(())
    }

    /// Delete a profile. The default profile is refused; pick a new default
    /// first.
    pub fn delete_profile(&self, id: i64) -> Result<()> {
        let profile = self
            .profile(id)?
            .ok_or_else(|| Error::NotFound(format!("profile {id}")))?;
        if profile.is_default {
            return Err(Error::Constraint(
                "the default profile cannot be deleted".to_string(),
            ));
        }

        self.db
            .connection()
            .execute("DELETE FROM browser_profiles WHERE id = ?", params![id])?;
        tracing::info!("Browser profile {id} deleted");
        Ok(())
    }

    /// Stamp a profile as just used
    pub fn record_profile_used(&self, id: i64) -> Result<()> {
        let rows = self.db.connection().execute(
            "UPDATE browser_profiles SET last_used = ?1 WHERE id = ?2",
            params![now_ms(), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("profile {id}")));
        }
        Ok(())
    }
}
