//! Category repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for positions

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Category, CategoryId, CategoryPatch, NewCategory};
use crate::util::now_ms;
use rusqlite::{params, Row, ToSql};

const CATEGORY_COLUMNS: &str = "id, name, icon, order_index, is_active, is_predefined, \
     color, badge, access_count, last_accessed, created_at, updated_at";

/// Trait for category storage operations
pub trait CategoryRepository {
    /// Create a new category; appended after the current maximum
    /// `order_index` unless the draft pins a position
    fn create(&self, draft: NewCategory) -> Result<Category>;

    /// Get a category by ID
    fn get(&self, id: CategoryId) -> Result<Option<Category>>;

    /// List categories in sidebar order
    fn list(&self, include_inactive: bool) -> Result<Vec<Category>>;

    /// Apply a field-wise update and return the new state
    fn update(&self, id: CategoryId, patch: CategoryPatch) -> Result<Category>;

    /// Delete a category; its items and panels go with it
    fn delete(&self, id: CategoryId) -> Result<()>;

    /// Rewrite every `order_index` from the full id sequence, atomically.
    /// Full-list based rather than incremental, so the result is internally
    /// consistent even when the caller worked from a stale snapshot.
    fn reorder(&self, ordered: &[CategoryId]) -> Result<()>;

    /// Bump the open counters (`access_count`, `last_accessed`)
    fn record_access(&self, id: CategoryId) -> Result<()>;
}

/// `SQLite` implementation of `CategoryRepository`
pub struct SqliteCategoryRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteCategoryRepository<'a> {
    /// Create a new repository over the given store handle
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Parse a category from a database row
    fn parse_category(row: &Row<'_>) -> rusqlite::Result<Category> {
        Ok(Category {
            id: CategoryId::new(row.get(0)?),
            name: row.get(1)?,
            icon: row.get(2)?,
            order_index: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
            is_predefined: row.get::<_, i64>(5)? != 0,
            color: row.get(6)?,
            badge: row.get(7)?,
            access_count: row.get(8)?,
            last_accessed: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create(&self, draft: NewCategory) -> Result<Category> {
        if draft.name.trim().is_empty() {
            return Err(Error::InvalidInput("category name must not be empty".into()));
        }

        let conn = self.db.connection();
        let order_index = match draft.order_index {
            Some(index) => index,
            None => conn.query_row(
                "SELECT COALESCE(MAX(order_index), 0) + 1 FROM categories",
                [],
                |row| row.get(0),
            )?,
        };

        let now = now_ms();
        conn.execute(
            "INSERT INTO categories
             (name, icon, order_index, is_predefined, color, badge, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                draft.name,
                draft.icon,
                order_index,
                i64::from(draft.is_predefined),
                draft.color,
                draft.badge,
                now
            ],
        )?;
        let id = CategoryId::new(conn.last_insert_rowid());
        tracing::info!("Category added: {} (ID: {id})", draft.name);

        Ok(Category {
            id,
            name: draft.name,
            icon: draft.icon,
            order_index,
            is_active: true,
            is_predefined: draft.is_predefined,
            color: draft.color,
            badge: draft.badge,
            access_count: 0,
            last_accessed: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: CategoryId) -> Result<Option<Category>> {
        let result = self.db.connection().query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"),
            params![id.as_i64()],
            Self::parse_category,
        );

        match result {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, include_inactive: bool) -> Result<Vec<Category>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE is_active = 1 OR ?1 = 1
             ORDER BY order_index, id"
        ))?;

        let categories = stmt
            .query_map(params![i64::from(include_inactive)], Self::parse_category)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(categories)
    }

    fn update(&self, id: CategoryId, patch: CategoryPatch) -> Result<Category> {
        if patch.is_empty() {
            return self
                .get(id)?
                .ok_or_else(|| Error::NotFound(format!("category {id}")));
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(name) = &patch.name {
            sets.push("name = ?");
            args.push(name);
        }
        if let Some(icon) = &patch.icon {
            sets.push("icon = ?");
            args.push(icon);
        }
        if let Some(order_index) = &patch.order_index {
            sets.push("order_index = ?");
            args.push(order_index);
        }
        if let Some(is_active) = &patch.is_active {
            sets.push("is_active = ?");
            args.push(is_active);
        }
        if let Some(color) = &patch.color {
            sets.push("color = ?");
            args.push(color);
        }
        if let Some(badge) = &patch.badge {
            sets.push("badge = ?");
            args.push(badge);
        }

        let now = now_ms();
        sets.push("updated_at = ?");
        args.push(&now);

        let raw_id = id.as_i64();
        args.push(&raw_id);

        let sql = format!("UPDATE categories SET {} WHERE id = ?", sets.join(", "));
        let rows = self.db.connection().execute(&sql, &args[..])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("category {id}")));
        }
        tracing::debug!("Category updated: ID {id}");

        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("category {id}")))
    }

    fn delete(&self, id: CategoryId) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM categories WHERE id = ?", params![id.as_i64()])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("category {id}")));
        }
        tracing::info!("Category deleted: ID {id}");
        Ok(())
    }

    fn reorder(&self, ordered: &[CategoryId]) -> Result<()> {
        let now = now_ms();
        self.db.with_transaction(|conn| {
            for (index, id) in ordered.iter().enumerate() {
                conn.execute(
                    "UPDATE categories SET order_index = ?1, updated_at = ?2 WHERE id = ?3",
                    params![index as i64, now, id.as_i64()],
                )?;
            }
            Ok(())
        })?;
        tracing::debug!("Categories reordered: {} entries", ordered.len());
        Ok(())
    }

    fn record_access(&self, id: CategoryId) -> Result<()> {
        let rows = self.db.connection().execute(
            "UPDATE categories
             SET access_count = access_count + 1, last_accessed = ?1
             WHERE id = ?2",
            params![now_ms(), id.as_i64()],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("category {id}")));
        }
        Ok(())
    }
}
