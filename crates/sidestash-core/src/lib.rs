//! sidestash-core - Core library for Sidestash
//!
//! This crate contains the shared models, database layer, and content
//! encryption used by every Sidestash surface (sidebar, pinned panels,
//! embedded browser). Presentation code calls into the repositories here
//! and gets plain records back; it never touches SQL or ciphertext.

pub mod crypto;
pub mod db;
pub mod error;
pub mod models;
mod util;

pub use crypto::ContentCipher;
pub use db::Database;
pub use error::{Error, Result};
pub use models::{Category, CategoryId, Item, ItemId};
