//! SQLite database connection management for TSNotes.
//!
//! Provides the [`Database`] struct that wraps a `rusqlite::Connection`
//! and automatically runs schema migrations on open.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::migrations;

/// Core database wrapper providing SQLite connection management.
///
/// The connection sits behind a mutex so one `Database` can be shared
/// between async tasks through an `Arc`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// Useful for testing: the database is discarded when the `Database` is dropped.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks and returns the underlying `rusqlite::Connection`.
    ///
    /// A poisoned lock is recovered: every statement runs to completion or
    /// fails atomically, so the connection stays usable.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
