//! Database layer for Sidestash

mod browser_repository;
mod category_repository;
mod clipboard_repository;
mod connection;
mod item_repository;
mod migrations;
mod panel_repository;
mod settings_repository;

pub use browser_repository::SqliteBrowserRepository;
pub use category_repository::{CategoryRepository, SqliteCategoryRepository};
pub use clipboard_repository::{ClipboardRepository, SqliteClipboardRepository};
pub use connection::Database;
pub use item_repository::{ItemRepository, SqliteItemRepository, DECRYPTION_PLACEHOLDER};
pub use panel_repository::{PanelRepository, SqlitePanelRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
