//! Item repository: item CRUD plus the ordered-list machinery
//!
//! Items may belong to a named list within their category (`list_group`),
//! where `orden_lista` holds their 1-based rank. Every operation here
//! preserves the contiguity invariant: for a given category and group the
//! set of ranks is exactly 1..=N. `list_group` is a shared column, not a
//! foreign key: list deletion is an explicit filtered delete, while
//! category deletion removes items through the schema-level cascade.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for counts and ranks

use crate::crypto::ContentCipher;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    CategoryId, Item, ItemDraft, ItemId, ItemKind, ItemPatch, ItemWithCategory, ListSummary, Tags,
};
use crate::util::now_ms;
use rusqlite::{params, Connection, Row, ToSql};

/// Substituted for content whose stored ciphertext cannot be decrypted.
/// One unreadable row must never abort a listing.
pub const DECRYPTION_PLACEHOLDER: &str = "[DECRYPTION ERROR]";

const ITEM_COLUMNS: &str = "id, category_id, label, content, type, icon, is_sensitive, \
     is_favorite, favorite_order, use_count, tags, description, working_dir, color, badge, \
     is_active, is_archived, created_at, updated_at, last_used, is_list, list_group, orden_lista";

const ITEM_COLUMNS_PREFIXED: &str = "i.id, i.category_id, i.label, i.content, i.type, i.icon, \
     i.is_sensitive, i.is_favorite, i.favorite_order, i.use_count, i.tags, i.description, \
     i.working_dir, i.color, i.badge, i.is_active, i.is_archived, i.created_at, i.updated_at, \
     i.last_used, i.is_list, i.list_group, i.orden_lista";

/// Trait for item storage operations
pub trait ItemRepository {
    /// Create a standalone item in a category
    fn create(&self, category_id: CategoryId, draft: ItemDraft) -> Result<Item>;

    /// Get an item by ID
    fn get(&self, id: ItemId) -> Result<Option<Item>>;

    /// List a category's items, oldest first
    fn list_by_category(&self, category_id: CategoryId, include_inactive: bool)
        -> Result<Vec<Item>>;

    /// List every item across categories with the owning category's display
    /// fields, newest first
    fn list_all(&self, include_inactive: bool) -> Result<Vec<ItemWithCategory>>;

    /// Apply a field-wise update and return the new state
    fn update(&self, id: ItemId, patch: ItemPatch) -> Result<Item>;

    /// Delete an item
    fn delete(&self, id: ItemId) -> Result<()>;

    /// Bump the usage counters (`use_count`, `last_used`)
    fn record_used(&self, id: ItemId) -> Result<()>;

    /// Create a named list: every draft becomes a member item ranked by its
    /// position in the slice. All inserts share one transaction; a failure
    /// anywhere leaves no trace of the list.
    fn create_list(
        &self,
        category_id: CategoryId,
        name: &str,
        drafts: &[ItemDraft],
    ) -> Result<Vec<ItemId>>;

    /// Summaries of the active lists in a category, newest first
    fn list_groups(&self, category_id: CategoryId) -> Result<Vec<ListSummary>>;

    /// A list's member items in rank order
    fn list_items(&self, category_id: CategoryId, name: &str) -> Result<Vec<Item>>;

    /// Move a list member to a new 1-based rank, shifting the members in
    /// between by one. The requested rank is clamped to `1..=N`; asking for
    /// the current rank is a no-op that writes nothing.
    fn reorder_list_item(&self, id: ItemId, new_position: i64) -> Result<()>;

    /// Rename a list and/or replace its member items.
    ///
    /// Replacement is delete-all-then-recreate: member item ids do NOT
    /// survive a replace. Callers that need stable ids must patch members
    /// individually instead.
    fn update_list(
        &self,
        category_id: CategoryId,
        name: &str,
        rename_to: Option<&str>,
        replace_with: Option<&[ItemDraft]>,
    ) -> Result<()>;

    /// Delete every member of a list; returns how many items were removed
    fn delete_list(&self, category_id: CategoryId, name: &str) -> Result<usize>;

    /// Whether `name` is free in the category. `exclude` skips a list's own
    /// current name so a rename never conflicts with itself.
    fn is_list_name_unique(
        &self,
        category_id: CategoryId,
        name: &str,
        exclude: Option<&str>,
    ) -> Result<bool>;
}

/// `SQLite` implementation of `ItemRepository`
pub struct SqliteItemRepository<'a> {
    db: &'a Database,
    cipher: &'a ContentCipher,
}

impl<'a> SqliteItemRepository<'a> {
    /// Create a new repository over the given store handle and cipher
    pub const fn new(db: &'a Database, cipher: &'a ContentCipher) -> Self {
        Self { db, cipher }
    }

    /// Parse an item from a database row. Content is still the stored value
    /// here; [`Self::reveal`] decrypts it afterwards.
    fn parse_item(row: &Row<'_>) -> rusqlite::Result<Item> {
        let kind: String = row.get(4)?;
        Ok(Item {
            id: ItemId::new(row.get(0)?),
            category_id: CategoryId::new(row.get(1)?),
            label: row.get(2)?,
            content: row.get(3)?,
            kind: kind.parse().unwrap_or_default(),
            icon: row.get(5)?,
            is_sensitive: row.get::<_, i64>(6)? != 0,
            is_favorite: row.get::<_, i64>(7)? != 0,
            favorite_order: row.get(8)?,
            use_count: row.get(9)?,
            tags: Tags::from_column(row.get::<_, Option<String>>(10)?.as_deref()),
            description: row.get(11)?,
            working_dir: row.get(12)?,
            color: row.get(13)?,
            badge: row.get(14)?,
            is_active: row.get::<_, i64>(15)? != 0,
            is_archived: row.get::<_, i64>(16)? != 0,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
            last_used: row.get(19)?,
            is_list: row.get::<_, i64>(20)? != 0,
            list_group: row.get(21)?,
            list_position: row.get(22)?,
        })
    }

    /// Replace stored ciphertext with plaintext for the caller. A row whose
    /// ciphertext is unreadable gets the placeholder instead of failing the
    /// whole read.
    fn reveal(&self, item: &mut Item) {
        if !item.is_sensitive || item.content.is_empty() {
            return;
        }
        match self.cipher.decrypt(&item.content) {
            Ok(plaintext) => item.content = plaintext,
            Err(err) => {
                tracing::warn!("Failed to decrypt item {}: {err}", item.id);
                item.content = DECRYPTION_PLACEHOLDER.to_string();
            }
        }
    }

    /// Insert one item row. `list_slot` carries the group name and 1-based
    /// rank for list members. Runs on whatever connection it is given so
    /// list creation can batch inserts inside a single transaction.
    fn insert_item(
        &self,
        conn: &Connection,
        category_id: CategoryId,
        draft: &ItemDraft,
        list_slot: Option<(&str, i64)>,
    ) -> Result<i64> {
        if draft.label.trim().is_empty() {
            return Err(Error::InvalidInput("item label must not be empty".into()));
        }

        let content = if draft.is_sensitive && !draft.content.is_empty() {
            self.cipher.encrypt(&draft.content)?
        } else {
            draft.content.clone()
        };

        let (is_list, list_group, position) = match list_slot {
            Some((name, position)) => (true, Some(name), position),
            None => (false, None, 0),
        };

        let now = now_ms();
        conn.execute(
            "INSERT INTO items
             (category_id, label, content, type, icon, is_sensitive, is_favorite, tags,
              description, working_dir, color, is_active, is_archived,
              is_list, list_group, orden_lista, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
            params![
                category_id.as_i64(),
                draft.label,
                content,
                draft.kind.as_str(),
                draft.icon,
                draft.is_sensitive,
                draft.is_favorite,
                draft.tags.to_json(),
                draft.description,
                draft.working_dir,
                draft.color,
                draft.is_active,
                draft.is_archived,
                is_list,
                list_group,
                position,
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Delete a list's member rows on the given connection
    fn delete_list_rows(conn: &Connection, category_id: CategoryId, name: &str) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM items WHERE category_id = ?1 AND list_group = ?2 AND is_list = 1",
            params![category_id.as_i64(), name],
        )?;
        Ok(deleted)
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create(&self, category_id: CategoryId, draft: ItemDraft) -> Result<Item> {
        let raw_id = self.insert_item(self.db.connection(), category_id, &draft, None)?;
        let id = ItemId::new(raw_id);
        tracing::info!(
            "Item added: {} (ID: {id}, Sensitive: {})",
            draft.label,
            draft.is_sensitive
        );
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("item {id}")))
    }

    fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let result = self.db.connection().query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"),
            params![id.as_i64()],
            Self::parse_item,
        );

        match result {
            Ok(mut item) => {
                self.reveal(&mut item);
                Ok(Some(item))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_category(
        &self,
        category_id: CategoryId,
        include_inactive: bool,
    ) -> Result<Vec<Item>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE category_id = ?1 AND (is_active = 1 OR ?2 = 1)
             ORDER BY created_at, id"
        ))?;

        let mut items = stmt
            .query_map(
                params![category_id.as_i64(), i64::from(include_inactive)],
                Self::parse_item,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for item in &mut items {
            self.reveal(item);
        }
        Ok(items)
    }

    fn list_all(&self, include_inactive: bool) -> Result<Vec<ItemWithCategory>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {ITEM_COLUMNS_PREFIXED}, c.name, c.icon, c.color
             FROM items i
             JOIN categories c ON i.category_id = c.id
             WHERE c.is_active = 1 OR ?1 = 1
             ORDER BY i.created_at DESC, i.id DESC"
        ))?;

        let mut entries = stmt
            .query_map(params![i64::from(include_inactive)], |row| {
                Ok(ItemWithCategory {
                    item: Self::parse_item(row)?,
                    category_name: row.get(23)?,
                    category_icon: row.get(24)?,
                    category_color: row.get(25)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for entry in &mut entries {
            self.reveal(&mut entry.item);
        }
        Ok(entries)
    }

    fn update(&self, id: ItemId, patch: ItemPatch) -> Result<Item> {
        if patch.is_empty() {
            return self
                .get(id)?
                .ok_or_else(|| Error::NotFound(format!("item {id}")));
        }

        let conn = self.db.connection();
        let stored = conn.query_row(
            "SELECT content, is_sensitive FROM items WHERE id = ?",
            params![id.as_i64()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? != 0)),
        );
        let (stored_content, currently_sensitive) = match stored {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(Error::NotFound(format!("item {id}")));
            }
            Err(e) => return Err(e.into()),
        };

        let will_be_sensitive = patch.is_sensitive.unwrap_or(currently_sensitive);

        // Resolve what the content column should hold after this patch. The
        // is_encrypted guard is what keeps a second pass over already-sealed
        // content from wrapping it again.
        let content_value: Option<String> = if let Some(content) = &patch.content {
            if will_be_sensitive && !content.is_empty() && !ContentCipher::is_encrypted(content) {
                Some(self.cipher.encrypt(content)?)
            } else {
                Some(content.clone())
            }
        } else if will_be_sensitive && !currently_sensitive {
            // Item is becoming sensitive: seal what is already stored
            if stored_content.is_empty() || ContentCipher::is_encrypted(&stored_content) {
                None
            } else {
                Some(self.cipher.encrypt(&stored_content)?)
            }
        } else if !will_be_sensitive && currently_sensitive {
            // Item is no longer sensitive: persist plaintext again. An
            // unreadable blob is a hard error here; substituting the
            // placeholder would overwrite the only copy of the data.
            if ContentCipher::is_encrypted(&stored_content) {
                Some(self.cipher.decrypt(&stored_content)?)
            } else {
                None
            }
        } else {
            None
        };

        let tags_json: Option<String> = patch.tags.as_ref().map(Tags::to_json);
        let kind_str: Option<&'static str> = patch.kind.map(ItemKind::as_str);
        let now = now_ms();
        let raw_id = id.as_i64();

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(label) = &patch.label {
            sets.push("label = ?");
            args.push(label);
        }
        if let Some(content) = &content_value {
            sets.push("content = ?");
            args.push(content);
        }
        if let Some(kind) = &kind_str {
            sets.push("type = ?");
            args.push(kind);
        }
        if let Some(icon) = &patch.icon {
            sets.push("icon = ?");
            args.push(icon);
        }
        if let Some(is_sensitive) = &patch.is_sensitive {
            sets.push("is_sensitive = ?");
            args.push(is_sensitive);
        }
        if let Some(is_favorite) = &patch.is_favorite {
            sets.push("is_favorite = ?");
            args.push(is_favorite);
        }
        if let Some(favorite_order) = &patch.favorite_order {
            sets.push("favorite_order = ?");
            args.push(favorite_order);
        }
        if let Some(tags) = &tags_json {
            sets.push("tags = ?");
            args.push(tags);
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            args.push(description);
        }
        if let Some(working_dir) = &patch.working_dir {
            sets.push("working_dir = ?");
            args.push(working_dir);
        }
        if let Some(color) = &patch.color {
            sets.push("color = ?");
            args.push(color);
        }
        if let Some(badge) = &patch.badge {
            sets.push("badge = ?");
            args.push(badge);
        }
        if let Some(is_active) = &patch.is_active {
            sets.push("is_active = ?");
            args.push(is_active);
        }
        if let Some(is_archived) = &patch.is_archived {
            sets.push("is_archived = ?");
            args.push(is_archived);
        }
        if let Some(is_list) = &patch.is_list {
            sets.push("is_list = ?");
            args.push(is_list);
        }
        if let Some(list_group) = &patch.list_group {
            sets.push("list_group = ?");
            args.push(list_group);
        }
        if let Some(list_position) = &patch.list_position {
            sets.push("orden_lista = ?");
            args.push(list_position);
        }

        sets.push("updated_at = ?");
        args.push(&now);
        args.push(&raw_id);

        let sql = format!("UPDATE items SET {} WHERE id = ?", sets.join(", "));
        let rows = conn.execute(&sql, &args[..])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("item {id}")));
        }
        tracing::debug!("Item updated: ID {id}");

        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("item {id}")))
    }

    fn delete(&self, id: ItemId) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM items WHERE id = ?", params![id.as_i64()])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("item {id}")));
        }
        tracing::info!("Item deleted: ID {id}");
        Ok(())
    }

    fn record_used(&self, id: ItemId) -> Result<()> {
        let rows = self.db.connection().execute(
            "UPDATE items SET use_count = use_count + 1, last_used = ?1 WHERE id = ?2",
            params![now_ms(), id.as_i64()],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("item {id}")));
        }
        Ok(())
    }

    fn create_list(
        &self,
        category_id: CategoryId,
        name: &str,
        drafts: &[ItemDraft],
    ) -> Result<Vec<ItemId>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("list name must not be empty".into()));
        }
        if drafts.is_empty() {
            return Err(Error::Constraint(
                "a list needs at least one item".to_string(),
            ));
        }
        if !self.is_list_name_unique(category_id, name, None)? {
            return Err(Error::Constraint(format!(
                "list '{name}' already exists in category {category_id}"
            )));
        }

        let ids = self.db.with_transaction(|conn| {
            let mut ids = Vec::with_capacity(drafts.len());
            for (index, draft) in drafts.iter().enumerate() {
                let position = index as i64 + 1;
                let raw_id = self.insert_item(conn, category_id, draft, Some((name, position)))?;
                ids.push(ItemId::new(raw_id));
            }
            Ok(ids)
        })?;

        tracing::info!(
            "List created: '{name}' with {} items in category {category_id}",
            ids.len()
        );
        Ok(ids)
    }

    fn list_groups(&self, category_id: CategoryId) -> Result<Vec<ListSummary>> {
        let mut stmt = self.db.connection().prepare(
            "SELECT
                 i.list_group,
                 COUNT(*) AS item_count,
                 (SELECT label FROM items x
                  WHERE x.category_id = i.category_id
                    AND x.list_group = i.list_group
                    AND x.is_list = 1
                  ORDER BY x.orden_lista LIMIT 1) AS first_label,
                 MIN(i.created_at) AS created_at,
                 MAX(i.last_used) AS last_used
             FROM items i
             WHERE i.category_id = ?1
               AND i.is_list = 1
               AND i.list_group IS NOT NULL
               AND i.is_active = 1
             GROUP BY i.list_group
             ORDER BY created_at DESC",
        )?;

        let summaries = stmt
            .query_map(params![category_id.as_i64()], |row| {
                Ok(ListSummary {
                    list_group: row.get(0)?,
                    item_count: row.get(1)?,
                    first_label: row.get(2)?,
                    created_at: row.get(3)?,
                    last_used: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }

    fn list_items(&self, category_id: CategoryId, name: &str) -> Result<Vec<Item>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE category_id = ?1 AND is_list = 1 AND list_group = ?2 AND is_active = 1
             ORDER BY orden_lista"
        ))?;

        let mut items = stmt
            .query_map(params![category_id.as_i64(), name], Self::parse_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for item in &mut items {
            self.reveal(item);
        }
        Ok(items)
    }

    fn reorder_list_item(&self, id: ItemId, new_position: i64) -> Result<()> {
        let item = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("item {id}")))?;
        if !item.is_list {
            return Err(Error::InvalidInput(format!(
                "item {id} is not part of a list"
            )));
        }
        let Some(group) = item.list_group else {
            return Err(Error::InvalidInput(format!(
                "item {id} has no list group"
            )));
        };

        let category_id = item.category_id;
        let old = item.list_position;

        let members: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM items
             WHERE category_id = ?1 AND list_group = ?2 AND is_list = 1",
            params![category_id.as_i64(), group],
            |row| row.get(0),
        )?;

        let target = new_position.clamp(1, members);
        if target == old {
            tracing::debug!("Item {id} already at position {old}");
            return Ok(());
        }

        self.db.with_transaction(|conn| {
            if target < old {
                // Moving earlier: everyone in [target, old) slides down one
                conn.execute(
                    "UPDATE items SET orden_lista = orden_lista + 1
                     WHERE category_id = ?1 AND list_group = ?2 AND is_list = 1
                       AND orden_lista >= ?3 AND orden_lista < ?4",
                    params![category_id.as_i64(), group, target, old],
                )?;
            } else {
                // Moving later: everyone in (old, target] slides up one
                conn.execute(
                    "UPDATE items SET orden_lista = orden_lista - 1
                     WHERE category_id = ?1 AND list_group = ?2 AND is_list = 1
                       AND orden_lista > ?3 AND orden_lista <= ?4",
                    params![category_id.as_i64(), group, old, target],
                )?;
            }
            conn.execute(
                "UPDATE items SET orden_lista = ?1 WHERE id = ?2",
                params![target, id.as_i64()],
            )?;
            Ok(())
        })?;

        tracing::debug!("Item {id} moved from position {old} to {target} in list '{group}'");
        Ok(())
    }

    fn update_list(
        &self,
        category_id: CategoryId,
        name: &str,
        rename_to: Option<&str>,
        replace_with: Option<&[ItemDraft]>,
    ) -> Result<()> {
        let rename = rename_to.map(str::trim).filter(|new_name| *new_name != name);
        if let Some(new_name) = rename {
            if new_name.is_empty() {
                return Err(Error::InvalidInput("list name must not be empty".into()));
            }
            if !self.is_list_name_unique(category_id, new_name, Some(name))? {
                return Err(Error::Constraint(format!(
                    "list '{new_name}' already exists in category {category_id}"
                )));
            }
        }
        if let Some(drafts) = replace_with {
            if drafts.is_empty() {
                return Err(Error::Constraint(
                    "a list needs at least one item".to_string(),
                ));
            }
        }
        if rename.is_none() && replace_with.is_none() {
            return Ok(());
        }

        let final_name = rename.unwrap_or(name);

        self.db.with_transaction(|conn| {
            if let Some(new_name) = rename {
                conn.execute(
                    "UPDATE items SET list_group = ?1, updated_at = ?2
                     WHERE category_id = ?3 AND list_group = ?4 AND is_list = 1",
                    params![new_name, now_ms(), category_id.as_i64(), name],
                )?;
                tracing::info!("List renamed: '{name}' -> '{new_name}'");
            }

            if let Some(drafts) = replace_with {
                Self::delete_list_rows(conn, category_id, final_name)?;
                for (index, draft) in drafts.iter().enumerate() {
                    let position = index as i64 + 1;
                    self.insert_item(conn, category_id, draft, Some((final_name, position)))?;
                }
                tracing::info!("List '{final_name}' replaced with {} items", drafts.len());
            }

            Ok(())
        })
    }

    fn delete_list(&self, category_id: CategoryId, name: &str) -> Result<usize> {
        let deleted = Self::delete_list_rows(self.db.connection(), category_id, name)?;
        tracing::info!("List '{name}' deleted ({deleted} items) from category {category_id}");
        Ok(deleted)
    }

    fn is_list_name_unique(
        &self,
        category_id: CategoryId,
        name: &str,
        exclude: Option<&str>,
    ) -> Result<bool> {
        // A rename to the list's own current name never conflicts
        if exclude == Some(name) {
            return Ok(true);
        }

        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM items
             WHERE category_id = ?1 AND list_group = ?2 AND is_list = 1",
            params![category_id.as_i64(), name],
            |row| row.get(0),
        )?;
        Ok(count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use crate::db::{CategoryRepository, SqliteCategoryRepository};
    use crate::models::NewCategory;
    use pretty_assertions::assert_eq;

    fn setup() -> (Database, ContentCipher) {
        (
            Database::open_in_memory().unwrap(),
            ContentCipher::new(&[9u8; KEY_LEN]),
        )
    }

    fn seed_category(db: &Database, name: &str) -> CategoryId {
        SqliteCategoryRepository::new(db)
            .create(NewCategory::new(name))
            .unwrap()
            .id
    }

    fn positions(db: &Database, category_id: CategoryId, group: &str) -> Vec<(String, i64)> {
        let mut stmt = db
            .connection()
            .prepare(
                "SELECT label, orden_lista FROM items
                 WHERE category_id = ?1 AND list_group = ?2 AND is_list = 1
                 ORDER BY orden_lista",
            )
            .unwrap();
        stmt.query_map(params![category_id.as_i64(), group], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap()
    }

    /// The ordering invariant: ranks are exactly 1..=N
    fn assert_contiguous(db: &Database, category_id: CategoryId, group: &str) {
        let ranks: Vec<i64> = positions(db, category_id, group)
            .into_iter()
            .map(|(_, rank)| rank)
            .collect();
        let expected: Vec<i64> = (1..=ranks.len() as i64).collect();
        assert_eq!(ranks, expected, "ranks must be contiguous 1..=N");
    }

    fn steps(labels: &[&str]) -> Vec<ItemDraft> {
        labels
            .iter()
            .map(|label| ItemDraft::new(*label, format!("run {label}")))
            .collect()
    }

    #[test]
    fn test_create_and_get() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Snippets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let draft = ItemDraft {
            kind: ItemKind::Code,
            tags: Tags::new(["deploy", "prod"]),
            ..ItemDraft::new("restart nginx", "sudo systemctl restart nginx")
        };
        let item = repo.create(category_id, draft).unwrap();

        assert_eq!(item.label, "restart nginx");
        assert_eq!(item.kind, ItemKind::Code);
        assert_eq!(item.tags.as_slice(), ["deploy", "prod"]);
        assert!(!item.is_list);

        let fetched = repo.get(item.id).unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[test]
    fn test_create_rejects_blank_label() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Snippets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        assert!(matches!(
            repo.create(category_id, ItemDraft::new("  ", "content")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sensitive_content_is_ciphertext_at_rest() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Secrets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(
                category_id,
                ItemDraft {
                    is_sensitive: true,
                    ..ItemDraft::new("db password", "hunter2")
                },
            )
            .unwrap();

        // Callers always see plaintext
        assert_eq!(item.content, "hunter2");

        // The column always holds ciphertext
        let stored: String = db
            .connection()
            .query_row(
                "SELECT content FROM items WHERE id = ?",
                params![item.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(ContentCipher::is_encrypted(&stored));
        assert_eq!(cipher.decrypt(&stored).unwrap(), "hunter2");
    }

    #[test]
    fn test_update_never_double_encrypts() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Secrets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(
                category_id,
                ItemDraft {
                    is_sensitive: true,
                    ..ItemDraft::new("token", "v1")
                },
            )
            .unwrap();

        // Two consecutive content updates; each must seal exactly once
        for value in ["v2", "v3"] {
            repo.update(
                item.id,
                ItemPatch {
                    content: Some(value.to_string()),
                    ..ItemPatch::default()
                },
            )
            .unwrap();

            let stored: String = db
                .connection()
                .query_row(
                    "SELECT content FROM items WHERE id = ?",
                    params![item.id.as_i64()],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(cipher.decrypt(&stored).unwrap(), value);
        }

        // Touching unrelated fields must not re-seal the stored ciphertext
        let before: String = db
            .connection()
            .query_row(
                "SELECT content FROM items WHERE id = ?",
                params![item.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        repo.update(
            item.id,
            ItemPatch {
                is_favorite: Some(true),
                ..ItemPatch::default()
            },
        )
        .unwrap();
        let after: String = db
            .connection()
            .query_row(
                "SELECT content FROM items WHERE id = ?",
                params![item.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_marking_sensitive_seals_stored_content() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Secrets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(category_id, ItemDraft::new("key", "plaintext-secret"))
            .unwrap();

        let updated = repo
            .update(
                item.id,
                ItemPatch {
                    is_sensitive: Some(true),
                    ..ItemPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.content, "plaintext-secret");

        let stored: String = db
            .connection()
            .query_row(
                "SELECT content FROM items WHERE id = ?",
                params![item.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(ContentCipher::is_encrypted(&stored));
    }

    #[test]
    fn test_unmarking_sensitive_stores_plaintext_again() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Secrets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(
                category_id,
                ItemDraft {
                    is_sensitive: true,
                    ..ItemDraft::new("key", "secret")
                },
            )
            .unwrap();

        repo.update(
            item.id,
            ItemPatch {
                is_sensitive: Some(false),
                ..ItemPatch::default()
            },
        )
        .unwrap();

        let stored: String = db
            .connection()
            .query_row(
                "SELECT content FROM items WHERE id = ?",
                params![item.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, "secret");
    }

    #[test]
    fn test_unreadable_ciphertext_degrades_per_row() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Secrets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let good = repo
            .create(
                category_id,
                ItemDraft {
                    is_sensitive: true,
                    ..ItemDraft::new("good", "readable")
                },
            )
            .unwrap();
        let bad = repo
            .create(
                category_id,
                ItemDraft {
                    is_sensitive: true,
                    ..ItemDraft::new("bad", "doomed")
                },
            )
            .unwrap();

        // Corrupt one row's ciphertext behind the store's back
        db.connection()
            .execute(
                "UPDATE items SET content = 'senc1:not-base64!' WHERE id = ?",
                params![bad.id.as_i64()],
            )
            .unwrap();

        let items = repo.list_by_category(category_id, false).unwrap();
        assert_eq!(items.len(), 2);

        let good_row = items.iter().find(|item| item.id == good.id).unwrap();
        let bad_row = items.iter().find(|item| item.id == bad.id).unwrap();
        assert_eq!(good_row.content, "readable");
        assert_eq!(bad_row.content, DECRYPTION_PLACEHOLDER);
    }

    #[test]
    fn test_tags_legacy_csv_read_rewritten_as_json() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Snippets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(category_id, ItemDraft::new("tagged", "content"))
            .unwrap();

        // Simulate a row written by a legacy release
        db.connection()
            .execute(
                "UPDATE items SET tags = 'alpha, beta' WHERE id = ?",
                params![item.id.as_i64()],
            )
            .unwrap();

        let fetched = repo.get(item.id).unwrap().unwrap();
        assert_eq!(fetched.tags.as_slice(), ["alpha", "beta"]);

        // Any write re-serializes tags as JSON
        repo.update(
            item.id,
            ItemPatch {
                tags: Some(fetched.tags.clone()),
                ..ItemPatch::default()
            },
        )
        .unwrap();
        let raw: String = db
            .connection()
            .query_row(
                "SELECT tags FROM items WHERE id = ?",
                params![item.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw, r#"["alpha","beta"]"#);
    }

    #[test]
    fn test_record_used_bumps_counters() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Snippets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(category_id, ItemDraft::new("hot", "content"))
            .unwrap();
        repo.record_used(item.id).unwrap();
        repo.record_used(item.id).unwrap();
        repo.record_used(item.id).unwrap();

        let fetched = repo.get(item.id).unwrap().unwrap();
        assert_eq!(fetched.use_count, 3);
        assert!(fetched.last_used.is_some());
    }

    #[test]
    fn test_category_delete_cascades_to_items() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Doomed");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create(category_id, ItemDraft::new("a", "1")).unwrap();
        repo.create_list(category_id, "steps", &steps(&["s1", "s2"]))
            .unwrap();

        SqliteCategoryRepository::new(&db)
            .delete(category_id)
            .unwrap();

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    // ----- list machinery -----

    #[test]
    fn test_create_list_assigns_ranks_in_input_order() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "deploy", &steps(&["pull", "build", "ship"]))
            .unwrap();
        assert_eq!(ids.len(), 3);

        assert_eq!(
            positions(&db, category_id, "deploy"),
            [
                ("pull".to_string(), 1),
                ("build".to_string(), 2),
                ("ship".to_string(), 3)
            ]
        );
        assert_contiguous(&db, category_id, "deploy");
    }

    #[test]
    fn test_create_list_rejects_empty() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        assert!(matches!(
            repo.create_list(category_id, "deploy", &[]),
            Err(Error::Constraint(_))
        ));
    }

    #[test]
    fn test_create_list_rejects_duplicate_name_in_category() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let other_category = seed_category(&db, "Other");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["a"]))
            .unwrap();

        // Same name, same category: rejected
        assert!(matches!(
            repo.create_list(category_id, "deploy", &steps(&["b"])),
            Err(Error::Constraint(_))
        ));

        // Same name, different category: fine
        repo.create_list(other_category, "deploy", &steps(&["c"]))
            .unwrap();
    }

    #[test]
    fn test_create_list_failure_leaves_no_rows() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let mut drafts = steps(&["one", "two", "three", "four"]);
        drafts.push(ItemDraft::new("", "blank label sinks the batch"));

        let err = repo
            .create_list(category_id, "doomed", &drafts)
            .unwrap_err();
        assert!(matches!(err, Error::Transaction(_)));
        assert!(matches!(err.root(), Error::InvalidInput(_)));

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "a failed list creation must persist nothing");
    }

    #[test]
    fn test_list_groups_summary() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["pull", "build", "ship"]))
            .unwrap();
        repo.create_list(category_id, "rollback", &steps(&["halt"]))
            .unwrap();
        // Standalone items never show up as lists
        repo.create(category_id, ItemDraft::new("loose", "x"))
            .unwrap();

        let mut groups = repo.list_groups(category_id).unwrap();
        groups.sort_by(|a, b| a.list_group.cmp(&b.list_group));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].list_group, "deploy");
        assert_eq!(groups[0].item_count, 3);
        assert_eq!(groups[0].first_label.as_deref(), Some("pull"));
        assert_eq!(groups[1].list_group, "rollback");
        assert_eq!(groups[1].item_count, 1);
    }

    #[test]
    fn test_list_items_in_rank_order_with_decryption() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let mut drafts = steps(&["login", "fetch"]);
        drafts.push(ItemDraft {
            is_sensitive: true,
            ..ItemDraft::new("token", "sekrit")
        });
        repo.create_list(category_id, "api", &drafts).unwrap();

        let items = repo.list_items(category_id, "api").unwrap();
        let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, ["login", "fetch", "token"]);
        assert_eq!(items[2].content, "sekrit");
        assert_eq!(items[2].list_position, 3);
    }

    #[test]
    fn test_reorder_move_to_front() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "l", &steps(&["a", "b", "c", "d", "e"]))
            .unwrap();

        // Move the item at rank 4 to rank 1: former 1,2,3 shift to 2,3,4;
        // former 5 is untouched
        repo.reorder_list_item(ids[3], 1).unwrap();

        assert_eq!(
            positions(&db, category_id, "l"),
            [
                ("d".to_string(), 1),
                ("a".to_string(), 2),
                ("b".to_string(), 3),
                ("c".to_string(), 4),
                ("e".to_string(), 5)
            ]
        );
        assert_contiguous(&db, category_id, "l");
    }

    #[test]
    fn test_reorder_move_to_back() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "l", &steps(&["a", "b", "c", "d"]))
            .unwrap();

        repo.reorder_list_item(ids[0], 4).unwrap();

        assert_eq!(
            positions(&db, category_id, "l"),
            [
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 3),
                ("a".to_string(), 4)
            ]
        );
        assert_contiguous(&db, category_id, "l");
    }

    #[test]
    fn test_reorder_by_one_slot_each_direction() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "l", &steps(&["a", "b", "c"]))
            .unwrap();

        // b one slot later
        repo.reorder_list_item(ids[1], 3).unwrap();
        assert_eq!(
            positions(&db, category_id, "l"),
            [
                ("a".to_string(), 1),
                ("c".to_string(), 2),
                ("b".to_string(), 3)
            ]
        );

        // b one slot earlier, back to the middle
        repo.reorder_list_item(ids[1], 2).unwrap();
        assert_eq!(
            positions(&db, category_id, "l"),
            [
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3)
            ]
        );
        assert_contiguous(&db, category_id, "l");
    }

    #[test]
    fn test_reorder_noop_writes_nothing() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "l", &steps(&["a", "b", "c"]))
            .unwrap();

        let before = repo.list_items(category_id, "l").unwrap();
        repo.reorder_list_item(ids[1], 2).unwrap();
        let after = repo.list_items(category_id, "l").unwrap();

        // Positions AND row versions (updated_at) unchanged
        assert_eq!(before, after);
    }

    #[test]
    fn test_reorder_singleton_group() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo.create_list(category_id, "solo", &steps(&["only"])).unwrap();

        repo.reorder_list_item(ids[0], 1).unwrap();
        repo.reorder_list_item(ids[0], 5).unwrap(); // clamped to 1
        assert_eq!(positions(&db, category_id, "solo"), [("only".to_string(), 1)]);
    }

    #[test]
    fn test_reorder_clamps_out_of_range_target() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "l", &steps(&["a", "b", "c"]))
            .unwrap();

        repo.reorder_list_item(ids[0], 99).unwrap();
        assert_eq!(
            positions(&db, category_id, "l"),
            [
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("a".to_string(), 3)
            ]
        );

        repo.reorder_list_item(ids[0], -7).unwrap();
        assert_eq!(
            positions(&db, category_id, "l"),
            [
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3)
            ]
        );
        assert_contiguous(&db, category_id, "l");
    }

    #[test]
    fn test_reorder_rejects_non_list_item() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Snippets");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let item = repo
            .create(category_id, ItemDraft::new("loose", "x"))
            .unwrap();
        assert!(matches!(
            repo.reorder_list_item(item.id, 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ordering_invariant_across_mixed_operations() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "l", &steps(&["a", "b", "c", "d", "e"]))
            .unwrap();

        repo.reorder_list_item(ids[4], 1).unwrap();
        repo.reorder_list_item(ids[0], 3).unwrap();
        repo.reorder_list_item(ids[2], 5).unwrap();
        repo.reorder_list_item(ids[2], 5).unwrap(); // no-op
        repo.reorder_list_item(ids[1], 2).unwrap();

        assert_contiguous(&db, category_id, "l");
    }

    #[test]
    fn test_delete_list_removes_only_that_group() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "keep", &steps(&["a", "b"]))
            .unwrap();
        repo.create_list(category_id, "drop", &steps(&["x", "y", "z"]))
            .unwrap();
        repo.create(category_id, ItemDraft::new("loose", "1"))
            .unwrap();

        let deleted = repo.delete_list(category_id, "drop").unwrap();
        assert_eq!(deleted, 3);

        let remaining: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 3); // "keep" pair + the loose item
    }

    #[test]
    fn test_update_list_rename() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        let ids = repo
            .create_list(category_id, "deploy", &steps(&["a", "b"]))
            .unwrap();

        repo.update_list(category_id, "deploy", Some("release"), None)
            .unwrap();

        assert!(positions(&db, category_id, "deploy").is_empty());
        assert_eq!(positions(&db, category_id, "release").len(), 2);

        // Item identities survive a rename
        let item = repo.get(ids[0]).unwrap().unwrap();
        assert_eq!(item.list_group.as_deref(), Some("release"));
    }

    #[test]
    fn test_update_list_rename_to_own_name_is_fine() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["a"]))
            .unwrap();
        repo.update_list(category_id, "deploy", Some("deploy"), None)
            .unwrap();
        assert_eq!(positions(&db, category_id, "deploy").len(), 1);
    }

    #[test]
    fn test_update_list_rename_conflict() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["a"]))
            .unwrap();
        repo.create_list(category_id, "rollback", &steps(&["b"]))
            .unwrap();

        assert!(matches!(
            repo.update_list(category_id, "deploy", Some("rollback"), None),
            Err(Error::Constraint(_))
        ));
    }

    #[test]
    fn test_update_list_replace_contents() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["old1", "old2"]))
            .unwrap();

        repo.update_list(
            category_id,
            "deploy",
            None,
            Some(&steps(&["new1", "new2", "new3"])),
        )
        .unwrap();

        assert_eq!(
            positions(&db, category_id, "deploy"),
            [
                ("new1".to_string(), 1),
                ("new2".to_string(), 2),
                ("new3".to_string(), 3)
            ]
        );
        assert_contiguous(&db, category_id, "deploy");
    }

    #[test]
    fn test_update_list_rename_and_replace_together() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["old"]))
            .unwrap();
        repo.update_list(
            category_id,
            "deploy",
            Some("release"),
            Some(&steps(&["fresh"])),
        )
        .unwrap();

        assert!(positions(&db, category_id, "deploy").is_empty());
        assert_eq!(
            positions(&db, category_id, "release"),
            [("fresh".to_string(), 1)]
        );
    }

    #[test]
    fn test_is_list_name_unique_exclusion() {
        let (db, cipher) = setup();
        let category_id = seed_category(&db, "Runbooks");
        let repo = SqliteItemRepository::new(&db, &cipher);

        repo.create_list(category_id, "deploy", &steps(&["a"]))
            .unwrap();

        assert!(!repo.is_list_name_unique(category_id, "deploy", None).unwrap());
        assert!(repo
            .is_list_name_unique(category_id, "deploy", Some("deploy"))
            .unwrap());
        assert!(repo.is_list_name_unique(category_id, "fresh", None).unwrap());
    }
}
