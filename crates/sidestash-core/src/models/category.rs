//! Category model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a category row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(i64);

impl CategoryId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A top-level group of items, manually ordered in the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,
    pub name: String,
    pub icon: Option<String>,
    /// Manual sidebar position; ties are broken by insertion order
    pub order_index: i64,
    pub is_active: bool,
    /// Seeded by the application rather than created by the user
    pub is_predefined: bool,
    pub color: Option<String>,
    pub badge: Option<String>,
    /// Times this category was opened
    pub access_count: i64,
    /// Unix ms of the most recent open, if any
    pub last_accessed: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a category
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub icon: Option<String>,
    pub is_predefined: bool,
    /// Explicit position; appended after the current maximum when absent
    pub order_index: Option<i64>,
    pub color: Option<String>,
    pub badge: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Field-wise category update. `None` leaves a column untouched;
/// double-`Option` fields clear the column with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub order_index: Option<i64>,
    pub is_active: Option<bool>,
    pub color: Option<Option<String>>,
    pub badge: Option<Option<String>>,
}

impl CategoryPatch {
    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.icon.is_none()
            && self.order_index.is_none()
            && self.is_active.is_none()
            && self.color.is_none()
            && self.badge.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_display() {
        assert_eq!(CategoryId::new(42).to_string(), "42");
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(CategoryPatch::default().is_empty());

        let patch = CategoryPatch {
            name: Some("Deploys".to_string()),
            ..CategoryPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
