//! Flat records for the embedded browser surface: bookmarks, speed dials,
//! saved sessions, and storage profiles

use serde::{Deserialize, Serialize};

/// A saved page, globally ordered by `order_index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub folder: Option<String>,
    pub icon: Option<String>,
    pub order_index: i64,
    pub created_at: i64,
}

/// Field-wise bookmark update
#[derive(Debug, Clone, Default)]
pub struct BookmarkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub folder: Option<Option<String>>,
    pub icon: Option<Option<String>>,
}

impl BookmarkPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.folder.is_none() && self.icon.is_none()
    }
}

/// A quick-access tile on the new-tab page; positions stay consecutive
/// from 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedDial {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub icon: String,
    pub background_color: String,
    pub thumbnail_path: Option<String>,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for adding a speed dial tile
#[derive(Debug, Clone)]
pub struct NewSpeedDial {
    pub title: String,
    pub url: String,
    pub icon: String,
    pub background_color: String,
    pub thumbnail_path: Option<String>,
}

impl NewSpeedDial {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            icon: "🌐".to_string(),
            background_color: "#16213e".to_string(),
            thumbnail_path: None,
        }
    }
}

/// Field-wise speed dial update
#[derive(Debug, Clone, Default)]
pub struct SpeedDialPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub background_color: Option<String>,
    pub thumbnail_path: Option<Option<String>>,
}

impl SpeedDialPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.icon.is_none()
            && self.background_color.is_none()
            && self.thumbnail_path.is_none()
    }
}

/// A saved set of browser tabs. At most one auto-save session exists;
/// saving a new one replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSession {
    pub id: i64,
    pub name: String,
    pub is_auto_save: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub tab_count: i64,
}

/// One tab within a saved session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTab {
    pub id: i64,
    pub session_id: i64,
    pub url: String,
    pub title: String,
    pub position: i64,
    pub is_active: bool,
}

/// Tab data captured when saving a session
#[derive(Debug, Clone, Default)]
pub struct TabDraft {
    pub url: String,
    pub title: String,
    pub position: i64,
    pub is_active: bool,
}

/// An isolated browser storage profile (cookies, local storage, cache).
/// Exactly one profile is the default; it cannot be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserProfile {
    pub id: i64,
    pub name: String,
    pub storage_path: String,
    pub is_default: bool,
    pub created_at: i64,
    pub last_used: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_dial_defaults() {
        let dial = NewSpeedDial::new("Docs", "https://docs.rs");
        assert_eq!(dial.icon, "🌐");
        assert_eq!(dial.background_color, "#16213e");
        assert!(dial.thumbnail_path.is_none());
    }
}
