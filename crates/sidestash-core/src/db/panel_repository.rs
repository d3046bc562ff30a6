//! Pinned panel repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CategoryId, NewPanel, PanelId, PanelPatch, PinnedPanel};
use crate::util::now_ms;
use rusqlite::{params, Row, ToSql};

const PANEL_COLUMNS: &str = "p.id, p.category_id, p.custom_name, p.custom_color, \
     p.x_position, p.y_position, p.width, p.height, p.is_minimized, p.filter_config, \
     p.keyboard_shortcut, p.open_count, p.last_opened, p.is_active, p.created_at, \
     c.name, c.icon";

/// Trait for pinned panel storage operations
pub trait PanelRepository {
    /// Persist a newly pinned panel; starts active with zeroed usage stats
    fn save(&self, panel: NewPanel) -> Result<PanelId>;

    /// Get a panel by ID
    fn get(&self, id: PanelId) -> Result<Option<PinnedPanel>>;

    /// List panels, most recently opened first
    fn list(&self, active_only: bool) -> Result<Vec<PinnedPanel>>;

    /// The active panel anchored to a category, if one exists
    fn get_by_category(&self, category_id: CategoryId) -> Result<Option<PinnedPanel>>;

    /// Apply a field-wise update and return the new state
    fn update(&self, id: PanelId, patch: PanelPatch) -> Result<PinnedPanel>;

    /// Bump the open counters (`open_count`, `last_opened`)
    fn record_opened(&self, id: PanelId) -> Result<()>;

    /// The most recently opened panels, active or not
    fn recent(&self, limit: usize) -> Result<Vec<PinnedPanel>>;

    /// Mark every panel inactive; called on application shutdown
    fn deactivate_all(&self) -> Result<()>;

    /// Unpin a panel
    fn delete(&self, id: PanelId) -> Result<()>;
}

/// `SQLite` implementation of `PanelRepository`
pub struct SqlitePanelRepository<'a> {
    db: &'a Database,
}

impl<'a> SqlitePanelRepository<'a> {
    /// Create a new repository over the given store handle
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Parse a panel (joined with its category's display fields) from a
    /// database row. A filter config that no longer decodes as JSON reads
    /// back as `None` rather than failing the row.
    fn parse_panel(row: &Row<'_>) -> rusqlite::Result<PinnedPanel> {
        let filter_raw: Option<String> = row.get(9)?;
        Ok(PinnedPanel {
            id: PanelId::new(row.get(0)?),
            category_id: CategoryId::new(row.get(1)?),
            custom_name: row.get(2)?,
            custom_color: row.get(3)?,
            x_position: row.get(4)?,
            y_position: row.get(5)?,
            width: row.get(6)?,
            height: row.get(7)?,
            is_minimized: row.get::<_, i64>(8)? != 0,
            filter_config: filter_raw.and_then(|raw| serde_json::from_str(&raw).ok()),
            keyboard_shortcut: row.get(10)?,
            open_count: row.get(11)?,
            last_opened: row.get(12)?,
            is_active: row.get::<_, i64>(13)? != 0,
            created_at: row.get(14)?,
            category_name: row.get(15)?,
            category_icon: row.get(16)?,
        })
    }
}

impl PanelRepository for SqlitePanelRepository<'_> {
    fn save(&self, panel: NewPanel) -> Result<PanelId> {
        let filter_json = panel
            .filter_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let now = now_ms();
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO pinned_panels
             (category_id, x_position, y_position, width, height, is_minimized,
              custom_name, custom_color, filter_config, keyboard_shortcut,
              last_opened, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                panel.category_id.as_i64(),
                panel.x_position,
                panel.y_position,
                panel.width,
                panel.height,
                panel.is_minimized,
                panel.custom_name,
                panel.custom_color,
                filter_json,
                panel.keyboard_shortcut,
                now
            ],
        )?;
        let id = PanelId::new(conn.last_insert_rowid());
        tracing::info!("Panel pinned: category {} (ID: {id})", panel.category_id);
        Ok(id)
    }

    fn get(&self, id: PanelId) -> Result<Option<PinnedPanel>> {
        let result = self.db.connection().query_row(
            &format!(
                "SELECT {PANEL_COLUMNS} FROM pinned_panels p
                 JOIN categories c ON p.category_id = c.id
                 WHERE p.id = ?"
            ),
            params![id.as_i64()],
            Self::parse_panel,
        );

        match result {
            Ok(panel) => Ok(Some(panel)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, active_only: bool) -> Result<Vec<PinnedPanel>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {PANEL_COLUMNS} FROM pinned_panels p
             JOIN categories c ON p.category_id = c.id
             WHERE p.is_active = 1 OR ?1 = 0
             ORDER BY p.last_opened DESC, p.id DESC"
        ))?;

        let panels = stmt
            .query_map(params![i64::from(active_only)], Self::parse_panel)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(panels)
    }

    fn get_by_category(&self, category_id: CategoryId) -> Result<Option<PinnedPanel>> {
        let result = self.db.connection().query_row(
            &format!(
                "SELECT {PANEL_COLUMNS} FROM pinned_panels p
                 JOIN categories c ON p.category_id = c.id
                 WHERE p.category_id = ? AND p.is_active = 1
                 LIMIT 1"
            ),
            params![category_id.as_i64()],
            Self::parse_panel,
        );

        match result {
            Ok(panel) => Ok(Some(panel)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update(&self, id: PanelId, patch: PanelPatch) -> Result<PinnedPanel> {
        if patch.is_empty() {
            return self
                .get(id)?
                .ok_or_else(|| Error::NotFound(format!("panel {id}")));
        }

        let filter_json: Option<Option<String>> = match &patch.filter_config {
            Some(Some(value)) => Some(Some(serde_json::to_string(value)?)),
            Some(None) => Some(None),
            None => None,
        };

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(x_position) = &patch.x_position {
            sets.push("x_position = ?");
            args.push(x_position);
        }
        if let Some(y_position) = &patch.y_position {
            sets.push("y_position = ?");
            args.push(y_position);
        }
        if let Some(width) = &patch.width {
            sets.push("width = ?");
            args.push(width);
        }
        if let Some(height) = &patch.height {
            sets.push("height = ?");
            args.push(height);
        }
        if let Some(is_minimized) = &patch.is_minimized {
            sets.push("is_minimized = ?");
            args.push(is_minimized);
        }
        if let Some(custom_name) = &patch.custom_name {
            sets.push("custom_name = ?");
            args.push(custom_name);
        }
        if let Some(custom_color) = &patch.custom_color {
            sets.push("custom_color = ?");
            args.push(custom_color);
        }
        if let Some(filter) = &filter_json {
            sets.push("filter_config = ?");
            args.push(filter);
        }
        if let Some(keyboard_shortcut) = &patch.keyboard_shortcut {
            sets.push("keyboard_shortcut = ?");
            args.push(keyboard_shortcut);
        }
        if let Some(is_active) = &patch.is_active {
            sets.push("is_active = ?");
            args.push(is_active);
        }

        let raw_id = id.as_i64();
        args.push(&raw_id);

        let sql = format!("UPDATE pinned_panels SET {} WHERE id = ?", sets.join(", "));
        let rows = self.db.connection().execute(&sql, &args[..])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("panel {id}")));
        }
        tracing::debug!("Panel updated: ID {id}");

        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("panel {id}")))
    }

    fn record_opened(&self, id: PanelId) -> Result<()> {
        let rows = self.db.connection().execute(
            "UPDATE pinned_panels
             SET open_count = open_count + 1, last_opened = ?1
             WHERE id = ?2",
            params![now_ms(), id.as_i64()],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("panel {id}")));
        }
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PinnedPanel>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {PANEL_COLUMNS} FROM pinned_panels p
             JOIN categories c ON p.category_id = c.id
             ORDER BY p.last_opened DESC, p.id DESC
             LIMIT ?"
        ))?;

        let panels = stmt
            .query_map(params![limit as i64], Self::parse_panel)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(panels)
    }

    fn deactivate_all(&self) -> Result<()> {
        self.db
            .connection()
            .execute("UPDATE pinned_panels SET is_active = 0", [])?;
        tracing::info!("All pinned panels marked as inactive");
        Ok(())
    }

    fn delete(&self, id: PanelId) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM pinned_panels WHERE id = ?", params![id.as_i64()])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("panel {id}")));
        }
        tracing::info!("Pinned panel deleted: ID {id}");
        Ok(())
    }
}
