//! SQLite-backed [`KeyTree`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use rusqlite::Connection;
use tracing::{debug, info};
use trustie_core::tree::TreeResult;
use trustie_core::{Hive, KeyTree, TreeError, TreeValue};

use crate::error::{Result, StorageError};
use crate::repository::{KeyRepo, ValueRepo};
use crate::schema::run_migrations;

/// Handle to a key row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeKey(i64);

impl TreeKey {
    pub fn id(self) -> i64 {
        self.0
    }
}

/// A persistent key tree stored in SQLite.
///
/// Used where the native registry is unavailable; the layout mirrors the
/// registry (three hive roots, case-insensitive key and value names).
///
/// Clones share one connection. Every [`KeyTree`] call runs in its own
/// transaction, so a call that reads before it writes sees no interleaved
/// writer.
#[derive(Clone)]
pub struct SqliteTree {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTree {
    /// Open the tree in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Open the tree at a specific path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening key tree at: {:?}", path);
        Self::prepare(Connection::open(&path)?)
    }

    /// Create an in-memory tree (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    /// Get the default database path.
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "trustie", "trustie")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("zonemap.db"))
    }

    fn prepare(mut conn: Connection) -> Result<Self> {
        // Deleting a key removes its values and subkeys through ON DELETE CASCADE.
        // journal_mode cannot change inside a transaction.
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        let tx = conn.transaction()?;
        run_migrations(&tx)?;
        tx.commit()?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` in a transaction, committing only if it succeeds.
    fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Config("Key tree connection poisoned".to_string()))?;

        let tx = conn.transaction()?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn run<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> TreeResult<T> {
        Ok(self.transaction(f)?)
    }
}

impl KeyTree for SqliteTree {
    type Key = TreeKey;

    fn open_hive(&self, hive: Hive) -> TreeResult<TreeKey> {
        self.run(|conn| KeyRepo::get_root(conn, hive.name()))?
            .map(TreeKey)
            .ok_or_else(|| TreeError::KeyNotFound(hive.name().to_string()))
    }

    // SQLite has no per-key access rights; `writable` only matters to the registry.
    fn open_child(
        &self,
        parent: &TreeKey,
        name: &str,
        _writable: bool,
    ) -> TreeResult<Option<TreeKey>> {
        Ok(self
            .run(|conn| KeyRepo::get_child(conn, parent.0, name))?
            .map(TreeKey))
    }

    fn open_or_create_child(&self, parent: &TreeKey, name: &str) -> TreeResult<TreeKey> {
        let id = self.run(|conn| KeyRepo::get_or_create_child(conn, parent.0, name))?;
        Ok(TreeKey(id))
    }

    fn delete_child(&self, parent: &TreeKey, name: &str) -> TreeResult<()> {
        debug!(key = parent.0, name, "Deleting key");
        self.run(|conn| KeyRepo::delete_child(conn, parent.0, name))
    }

    fn get_value(&self, key: &TreeKey, name: &str) -> TreeResult<Option<TreeValue>> {
        self.run(|conn| ValueRepo::get(conn, key.0, name))
    }

    fn set_value(&self, key: &TreeKey, name: &str, value: &TreeValue) -> TreeResult<()> {
        self.run(|conn| ValueRepo::set(conn, key.0, name, value))
    }

    fn delete_value(&self, key: &TreeKey, name: &str) -> TreeResult<()> {
        match self.transaction(|conn| ValueRepo::delete(conn, key.0, name)) {
            Err(StorageError::NotFound(what)) => Err(TreeError::ValueNotFound(what)),
            other => Ok(other?),
        }
    }

    fn value_names(&self, key: &TreeKey) -> TreeResult<Vec<String>> {
        self.run(|conn| ValueRepo::names(conn, key.0))
    }

    fn child_names(&self, key: &TreeKey) -> TreeResult<Vec<String>> {
        self.run(|conn| KeyRepo::child_names(conn, key.0))
    }

    fn value_count(&self, key: &TreeKey) -> TreeResult<usize> {
        self.run(|conn| ValueRepo::count(conn, key.0))
    }

    fn child_count(&self, key: &TreeKey) -> TreeResult<usize> {
        self.run(|conn| KeyRepo::child_count(conn, key.0))
    }
}
