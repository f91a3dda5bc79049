//! Key repository.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StorageError};

/// Repository for key operations.
pub struct KeyRepo;

impl KeyRepo {
    /// Get the root key of a hive by its predefined name.
    pub fn get_root(conn: &Connection, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM tree_keys WHERE parent_id IS NULL AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    /// Check that a key exists.
    pub fn exists(conn: &Connection, id: i64) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM tree_keys WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(found.is_some())
    }

    /// Get a direct child by name.
    pub fn get_child(conn: &Connection, parent_id: i64, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM tree_keys WHERE parent_id = ?1 AND name = ?2",
                params![parent_id, name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    /// Get a direct child, creating it if needed.
    pub fn get_or_create_child(conn: &Connection, parent_id: i64, name: &str) -> Result<i64> {
        if let Some(id) = Self::get_child(conn, parent_id, name)? {
            return Ok(id);
        }
        if !Self::exists(conn, parent_id)? {
            return Err(StorageError::NotFound(format!("key #{}", parent_id)));
        }

        conn.execute(
            "INSERT INTO tree_keys (parent_id, name) VALUES (?1, ?2)",
            params![parent_id, name],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Delete a direct child that has no children of its own.
    pub fn delete_child(conn: &Connection, parent_id: i64, name: &str) -> Result<()> {
        let id = Self::get_child(conn, parent_id, name)?
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;

        if Self::child_count(conn, id)? > 0 {
            return Err(StorageError::HasChildren(name.to_string()));
        }

        conn.execute("DELETE FROM tree_keys WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Get the names of all direct children.
    pub fn child_names(conn: &Connection, parent_id: i64) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT name FROM tree_keys WHERE parent_id = ?1 ORDER BY name")?;

        let names = stmt
            .query_map([parent_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names)
    }

    /// Count direct children.
    pub fn child_count(conn: &Connection, parent_id: i64) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tree_keys WHERE parent_id = ?1",
            [parent_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}
