//! Versioned SQLite schema for the record store
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once, inside its own transaction, and is
//! recorded with a timestamp. Migrations only ever add kinds and indexes.

use chrono::Utc;
use rusqlite::{params, Connection, Result};
use tracing::debug;

/// Current schema version. Bump this when adding a new migration.
pub const SCHEMA_VERSION: i32 = 2;

type Migration = fn(&Connection) -> Result<()>;

/// Ordered migration steps: (version, description, step)
const MIGRATIONS: &[(i32, &str, Migration)] = &[
    (1, "Create bookmark, pageReference, group and query kinds", migration_v1),
    (2, "Index pageReference by url", migration_v2),
];

/// Run every migration newer than the stored version
///
/// Safe to call on every open.
pub fn run_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn)?;

    for (version, description, step) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        debug!("Applying schema migration v{}: {}", version, description);
        let tx = conn.unchecked_transaction()?;
        step(&tx)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
            params![version, Utc::now().timestamp_millis(), description],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Get the stored schema version (0 when nothing has been applied)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}

/// Check if the schema needs initialization or migration
pub fn needs_migration(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(v) => v < SCHEMA_VERSION,
        Err(_) => true,
    }
}

/// V1: one table per record kind
fn migration_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS bookmark_store (
            key INTEGER PRIMARY KEY AUTOINCREMENT,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS page_reference_store (
            key INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_store (
            key TEXT PRIMARY KEY,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS query_store (
            key INTEGER PRIMARY KEY AUTOINCREMENT,
            data TEXT NOT NULL
        );
        "#,
    )
}

/// V2: secondary index used for URL lookups and uniqueness
fn migration_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_page_reference_url ON page_reference_store(url);",
    )
}
