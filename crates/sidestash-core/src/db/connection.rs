//! Database connection management

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Owner of the single `SQLite` connection shared by every store.
///
/// One `Database` is opened per process and injected by reference into each
/// repository; there is no global handle. All access is synchronous on the
/// caller's thread, and the process is the only writer. Readers racing the
/// writer rely on `SQLite`'s own isolation, not on locking here.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if absent) the database at the given path.
    ///
    /// Applies connection pragmas and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for this workload
    fn configure(&self) -> Result<()> {
        // WAL and the cache tuning are best-effort; foreign keys are not
        self.conn.pragma_update(None, "journal_mode", "WAL").ok();
        self.conn.pragma_update(None, "synchronous", "NORMAL").ok();
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.pragma_update(None, "cache_size", 10_000).ok();
        Ok(())
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction: committed when it returns `Ok`, rolled
    /// back when it returns `Err`. The original error comes back wrapped in
    /// [`Error::Transaction`] so callers can tell a rolled-back write from a
    /// plain one; [`Error::root`] recovers the cause.
    ///
    /// Every multi-row mutation in this crate (list creation, list
    /// reposition, list rename and replace, bulk category reorder, session
    /// save, speed dial renumbering) goes through here; a half-applied
    /// shift must never be observable.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!("Rollback failed after transaction error: {rollback_err}");
                }
                tracing::error!("Transaction failed: {err}");
                Err(Error::Transaction(Box::new(err)))
            }
        }
    }

    /// Close the connection explicitly.
    ///
    /// Consuming `self` makes a double close unrepresentable; dropping the
    /// `Database` closes the connection too, so calling this is optional but
    /// surfaces close-time errors instead of swallowing them.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| {
            tracing::error!("Failed to close database connection: {err}");
            Error::Sqlite(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_on_disk_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidestash.db");

        {
            let db = Database::open(&path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO categories (name, order_index, created_at, updated_at)
                     VALUES ('Servers', 1, 0, 0)",
                    [],
                )
                .unwrap();
            db.close().unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.connection().execute(
            "INSERT INTO items (category_id, label, content, created_at, updated_at)
             VALUES (999, 'orphan', '', 0, 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_with_transaction_commits() {
        let db = Database::open_in_memory().unwrap();
        db.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO categories (name, order_index, created_at, updated_at)
                 VALUES ('Deploys', 1, 0, 0)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_with_transaction_rolls_back_and_wraps() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .with_transaction::<(), _>(|conn| {
                conn.execute(
                    "INSERT INTO categories (name, order_index, created_at, updated_at)
                     VALUES ('Doomed', 1, 0, 0)",
                    [],
                )?;
                Err(Error::InvalidInput("forced failure".into()))
            })
            .unwrap_err();

        assert!(matches!(err, Error::Transaction(_)));
        assert!(matches!(err.root(), Error::InvalidInput(_)));

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
