//! Value repository.

use rusqlite::{params, Connection, OptionalExtension};
use trustie_core::TreeValue;

use crate::error::{Result, StorageError};
use crate::repository::KeyRepo;

/// Repository for value operations.
pub struct ValueRepo;

impl ValueRepo {
    /// Get a value by name.
    pub fn get(conn: &Connection, key_id: i64, name: &str) -> Result<Option<TreeValue>> {
        let row = conn
            .query_row(
                "SELECT kind, dword_value, string_value FROM tree_values
                 WHERE key_id = ?1 AND name = ?2",
                params![key_id, name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((kind, dword, string)) = row else {
            return Ok(None);
        };

        match (kind.as_str(), dword, string) {
            ("dword", Some(v), _) => Ok(Some(TreeValue::Dword(v as u32))),
            ("string", _, Some(s)) => Ok(Some(TreeValue::String(s))),
            _ => Err(StorageError::Config(format!(
                "malformed value {} on key #{}",
                name, key_id
            ))),
        }
    }

    /// Set a value (insert or replace).
    pub fn set(conn: &Connection, key_id: i64, name: &str, value: &TreeValue) -> Result<()> {
        if !KeyRepo::exists(conn, key_id)? {
            return Err(StorageError::NotFound(format!("key #{}", key_id)));
        }

        let (kind, dword, string) = match value {
            TreeValue::Dword(v) => ("dword", Some(i64::from(*v)), None),
            TreeValue::String(s) => ("string", None, Some(s.as_str())),
        };

        conn.execute(
            "INSERT INTO tree_values (key_id, name, kind, dword_value, string_value)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key_id, name) DO UPDATE SET
                kind = ?3, dword_value = ?4, string_value = ?5",
            params![key_id, name, kind, dword, string],
        )?;

        Ok(())
    }

    /// Delete a value.
    pub fn delete(conn: &Connection, key_id: i64, name: &str) -> Result<()> {
        let deleted = conn.execute(
            "DELETE FROM tree_values WHERE key_id = ?1 AND name = ?2",
            params![key_id, name],
        )?;

        if deleted == 0 {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Get the names of all values on a key.
    pub fn names(conn: &Connection, key_id: i64) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT name FROM tree_values WHERE key_id = ?1 ORDER BY name")?;

        let names = stmt
            .query_map([key_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names)
    }

    /// Count values on a key.
    pub fn count(conn: &Connection, key_id: i64) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tree_values WHERE key_id = ?1",
            [key_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}
