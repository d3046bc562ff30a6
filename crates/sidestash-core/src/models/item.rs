//! Item model: stored snippets, commands, URLs, and list steps

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an item row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(i64);

impl ItemId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of content an item holds; stored as the legacy uppercase tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKind {
    #[default]
    Text,
    Url,
    Code,
    Path,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Url => "URL",
            Self::Code => "CODE",
            Self::Path => "PATH",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT" => Ok(Self::Text),
            "URL" => Ok(Self::Url),
            "CODE" => Ok(Self::Code),
            "PATH" => Ok(Self::Path),
            other => Err(Error::InvalidInput(format!("unknown item kind: {other}"))),
        }
    }
}

/// An ordered, deduplicated set of tag strings.
///
/// The stored column historically held either a JSON array or a bare
/// comma-separated string. Reads accept both encodings permanently;
/// writes always emit the JSON form. Keep that asymmetry: it is a
/// compatibility shim for databases written by older releases, not an
/// accident to normalize away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Build from any string collection, trimming entries, dropping empties,
    /// and deduplicating while preserving first-seen order
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        Self(out)
    }

    /// Decode the stored column value: JSON array first, then the legacy
    /// comma-separated fallback
    #[must_use]
    pub fn from_column(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        if raw.trim().is_empty() {
            return Self::default();
        }
        if let Ok(parsed) = serde_json::from_str::<Vec<String>>(raw) {
            return Self::new(parsed);
        }
        Self::new(raw.split(','))
    }

    /// Encode for storage; always the JSON form
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

/// An item as returned to callers: tags decoded, sensitive content already
/// decrypted (or the decryption placeholder when the stored blob is
/// unreadable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub category_id: super::CategoryId,
    pub label: String,
    pub content: String,
    pub kind: ItemKind,
    pub icon: Option<String>,
    /// Content is ciphertext at rest when set
    pub is_sensitive: bool,
    pub is_favorite: bool,
    pub favorite_order: i64,
    pub use_count: i64,
    pub tags: Tags,
    pub description: Option<String>,
    /// Working directory for CODE items
    pub working_dir: Option<String>,
    pub color: Option<String>,
    pub badge: Option<String>,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_used: Option<i64>,
    /// Member of a named ordered list
    pub is_list: bool,
    /// Name of the list this item belongs to
    pub list_group: Option<String>,
    /// 1-based rank within the list group; 0 outside lists
    pub list_position: i64,
}

/// Input for creating an item (standalone or as a list step)
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub label: String,
    pub content: String,
    pub kind: ItemKind,
    pub icon: Option<String>,
    pub is_sensitive: bool,
    pub is_favorite: bool,
    pub tags: Tags,
    pub description: Option<String>,
    pub working_dir: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
    pub is_archived: bool,
}

impl ItemDraft {
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

impl Default for ItemDraft {
    fn default() -> Self {
        Self {
            label: String::new(),
            content: String::new(),
            kind: ItemKind::Text,
            icon: None,
            is_sensitive: false,
            is_favorite: false,
            tags: Tags::default(),
            description: None,
            working_dir: None,
            color: None,
            is_active: true,
            is_archived: false,
        }
    }
}

/// Field-wise item update. `None` leaves a column untouched;
/// double-`Option` fields clear the column with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub label: Option<String>,
    pub content: Option<String>,
    pub kind: Option<ItemKind>,
    pub icon: Option<Option<String>>,
    pub is_sensitive: Option<bool>,
    pub is_favorite: Option<bool>,
    pub favorite_order: Option<i64>,
    pub tags: Option<Tags>,
    pub description: Option<Option<String>>,
    pub working_dir: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub badge: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_archived: Option<bool>,
    pub is_list: Option<bool>,
    pub list_group: Option<Option<String>>,
    pub list_position: Option<i64>,
}

impl ItemPatch {
    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.content.is_none()
            && self.kind.is_none()
            && self.icon.is_none()
            && self.is_sensitive.is_none()
            && self.is_favorite.is_none()
            && self.favorite_order.is_none()
            && self.tags.is_none()
            && self.description.is_none()
            && self.working_dir.is_none()
            && self.color.is_none()
            && self.badge.is_none()
            && self.is_active.is_none()
            && self.is_archived.is_none()
            && self.is_list.is_none()
            && self.list_group.is_none()
            && self.list_position.is_none()
    }
}

/// One row per list group: aggregate view for pickers and dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub list_group: String,
    pub item_count: i64,
    /// Label of the step at position 1
    pub first_label: Option<String>,
    pub created_at: i64,
    pub last_used: Option<i64>,
}

/// An item joined with display fields of its owning category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemWithCategory {
    pub item: Item,
    pub category_name: String,
    pub category_icon: Option<String>,
    pub category_color: Option<String>,
}
