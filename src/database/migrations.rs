//! Schema migrations for the TSNotes state database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Key-value store for extension state")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: JSON-valued key-value table.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )
}
