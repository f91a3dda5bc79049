//! Database schema and migrations.

use rusqlite::{params, Connection};
use tracing::info;
use trustie_core::Hive;

use crate::error::{Result, StorageError};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(StorageError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version < SCHEMA_VERSION {
        info!(
            "Running migrations from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        if current_version < 1 {
            migrate_v1(conn)?;
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
        info!("Migrations complete");
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration to version 1: key tree.
fn migrate_v1(conn: &Connection) -> Result<()> {
    info!("Applying migration v1: key tree");

    // Keys - one row per key, hive roots have no parent
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tree_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER REFERENCES tree_keys (id) ON DELETE CASCADE,
            name TEXT NOT NULL COLLATE NOCASE,
            UNIQUE (parent_id, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tree_keys_parent ON tree_keys (parent_id)",
        [],
    )?;

    // Values - REG_DWORD in dword_value, REG_SZ in string_value
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tree_values (
            key_id INTEGER NOT NULL REFERENCES tree_keys (id) ON DELETE CASCADE,
            name TEXT NOT NULL COLLATE NOCASE,
            kind TEXT NOT NULL CHECK (kind IN ('dword', 'string')),
            dword_value INTEGER,
            string_value TEXT,
            PRIMARY KEY (key_id, name)
        )",
        [],
    )?;

    for hive in Hive::ALL {
        conn.execute(
            "INSERT INTO tree_keys (parent_id, name) VALUES (NULL, ?1)",
            params![hive.name()],
        )?;
    }

    Ok(())
}
