//! Clipboard history model

use super::{ItemId, ItemKind};
use serde::{Deserialize, Serialize};

/// One copied value, newest-first in listings.
///
/// `item_id` points at the item the copy came from, when there was one; it
/// survives item deletion as `None` rather than taking the history row with
/// it. `item_label`/`item_kind` are join fields, absent for free-form copies
/// and for copies whose source item is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub id: i64,
    pub item_id: Option<ItemId>,
    pub content: String,
    pub copied_at: i64,
    pub item_label: Option<String>,
    pub item_kind: Option<ItemKind>,
}
