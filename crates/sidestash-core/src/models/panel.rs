//! Pinned panel model

use super::CategoryId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a pinned panel row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelId(i64);

impl PanelId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A saved, positioned view of one category's items, persisted across
/// sessions. Many panels may point at one category; deleting the category
/// deletes its panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedPanel {
    pub id: PanelId,
    pub category_id: CategoryId,
    pub custom_name: Option<String>,
    pub custom_color: Option<String>,
    pub x_position: i64,
    pub y_position: i64,
    pub width: i64,
    pub height: i64,
    pub is_minimized: bool,
    /// Caller-defined filter state, stored as JSON
    pub filter_config: Option<serde_json::Value>,
    /// e.g. "Ctrl+Shift+1"
    pub keyboard_shortcut: Option<String>,
    pub open_count: i64,
    pub last_opened: i64,
    pub is_active: bool,
    pub created_at: i64,
    /// Display fields joined from the owning category
    pub category_name: String,
    pub category_icon: Option<String>,
}

/// Input for pinning a panel
#[derive(Debug, Clone)]
pub struct NewPanel {
    pub category_id: CategoryId,
    pub x_position: i64,
    pub y_position: i64,
    pub width: i64,
    pub height: i64,
    pub is_minimized: bool,
    pub custom_name: Option<String>,
    pub custom_color: Option<String>,
    pub filter_config: Option<serde_json::Value>,
    pub keyboard_shortcut: Option<String>,
}

impl NewPanel {
    /// Panel at the given screen position with the default geometry
    pub const fn new(category_id: CategoryId, x_position: i64, y_position: i64) -> Self {
        Self {
            category_id,
            x_position,
            y_position,
            width: 350,
            height: 500,
            is_minimized: false,
            custom_name: None,
            custom_color: None,
            filter_config: None,
            keyboard_shortcut: None,
        }
    }
}

/// Field-wise panel update. `None` leaves a column untouched;
/// double-`Option` fields clear the column with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct PanelPatch {
    pub x_position: Option<i64>,
    pub y_position: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub is_minimized: Option<bool>,
    pub custom_name: Option<Option<String>>,
    pub custom_color: Option<Option<String>>,
    pub filter_config: Option<Option<serde_json::Value>>,
    pub keyboard_shortcut: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl PanelPatch {
    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.x_position.is_none()
            && self.y_position.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.is_minimized.is_none()
            && self.custom_name.is_none()
            && self.custom_color.is_none()
            && self.filter_config.is_none()
            && self.keyboard_shortcut.is_none()
            && self.is_active.is_none()
    }
}
