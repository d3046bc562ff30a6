//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations. Safe to call repeatedly: every statement is
/// `IF NOT EXISTS` / `OR IGNORE` and versions already applied are skipped.
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Apply one migration batch atomically
fn apply(conn: &Connection, sql: &str, version: i32) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.commit()?;
    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: core tables, indexes, and seeded settings.
///
/// Column names (including `orden_lista`) match the database files written
/// by earlier releases.
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000),
            updated_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000)
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            icon TEXT,
            order_index INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_predefined INTEGER NOT NULL DEFAULT 0,
            color TEXT,
            badge TEXT,
            access_count INTEGER NOT NULL DEFAULT 0,
            last_accessed INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            label TEXT NOT NULL,
            content TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'TEXT' CHECK(type IN ('TEXT', 'URL', 'CODE', 'PATH')),
            icon TEXT,
            is_sensitive INTEGER NOT NULL DEFAULT 0,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            favorite_order INTEGER NOT NULL DEFAULT 0,
            use_count INTEGER NOT NULL DEFAULT 0,
            tags TEXT,
            description TEXT,
            working_dir TEXT,
            color TEXT,
            badge TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            last_used INTEGER,
            is_list INTEGER NOT NULL DEFAULT 0,
            list_group TEXT,
            orden_lista INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS clipboard_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER REFERENCES items(id) ON DELETE SET NULL,
            content TEXT NOT NULL,
            copied_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pinned_panels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            custom_name TEXT,
            custom_color TEXT,
            x_position INTEGER NOT NULL,
            y_position INTEGER NOT NULL,
            width INTEGER NOT NULL DEFAULT 350,
            height INTEGER NOT NULL DEFAULT 500,
            is_minimized INTEGER NOT NULL DEFAULT 0,
            filter_config TEXT,
            keyboard_shortcut TEXT,
            open_count INTEGER NOT NULL DEFAULT 0,
            last_opened INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_categories_order ON categories(order_index);
        CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_id);
        CREATE INDEX IF NOT EXISTS idx_items_last_used ON items(last_used DESC);
        CREATE INDEX IF NOT EXISTS idx_items_orden_lista
            ON items(category_id, list_group, orden_lista) WHERE is_list = 1;
        CREATE INDEX IF NOT EXISTS idx_clipboard_history_date ON clipboard_history(copied_at DESC);
        CREATE INDEX IF NOT EXISTS idx_pinned_category ON pinned_panels(category_id);
        CREATE INDEX IF NOT EXISTS idx_pinned_last_opened ON pinned_panels(last_opened DESC);
        CREATE INDEX IF NOT EXISTS idx_pinned_active ON pinned_panels(is_active);

        INSERT OR IGNORE INTO settings (key, value) VALUES
            ('theme', '\"dark\"'),
            ('panel_width', '300'),
            ('sidebar_width', '70'),
            ('hotkey', '\"ctrl+shift+v\"'),
            ('always_on_top', 'true'),
            ('start_with_windows', 'false'),
            ('animation_speed', '300'),
            ('opacity', '0.95'),
            ('max_history', '20');

        INSERT INTO schema_version (version) VALUES (1);",
        1,
    )
}

/// Migration to version 2: embedded browser surface (bookmarks, speed
/// dials, sessions, storage profiles)
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        "CREATE TABLE IF NOT EXISTS bookmarks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            folder TEXT,
            icon TEXT,
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS speed_dials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            icon TEXT NOT NULL DEFAULT '🌐',
            background_color TEXT NOT NULL DEFAULT '#16213e',
            thumbnail_path TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS browser_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            is_auto_save INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_tabs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL REFERENCES browser_sessions(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS browser_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            storage_path TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000),
            last_used INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000)
        );

        CREATE INDEX IF NOT EXISTS idx_bookmarks_order ON bookmarks(order_index);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks(url);
        CREATE INDEX IF NOT EXISTS idx_speed_dials_position ON speed_dials(position);
        CREATE INDEX IF NOT EXISTS idx_session_tabs_session ON session_tabs(session_id);

        INSERT OR IGNORE INTO browser_profiles (name, storage_path, is_default)
            VALUES ('Default', 'browser_data/default', 1);

        INSERT INTO schema_version (version) VALUES (2);",
        2,
    )
}
