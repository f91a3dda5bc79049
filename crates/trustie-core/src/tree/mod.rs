//! Hierarchical key-value store abstraction.
//!
//! The zone map lives in the Windows Registry, but everything layered on top
//! of it only needs a tree of named keys holding named values. [`KeyTree`]
//! captures that surface so the same logic runs against:
//!
//! - [`RegistryTree`] (Windows only): the native registry via `winreg`
//! - [`MemoryTree`]: an in-memory tree, used by tests
//! - `trustie_storage::SqliteTree`: an embedded SQLite-backed tree
//!
//! Key and value names are matched case-insensitively, like the registry.

mod memory;
#[cfg(target_os = "windows")]
mod registry;

pub use memory::{MemoryKey, MemoryTree};
#[cfg(target_os = "windows")]
pub use registry::RegistryTree;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`KeyTree`] implementations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The key does not exist (or was deleted).
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The value does not exist.
    #[error("value not found: {0}")]
    ValueNotFound(String),

    /// Attempted to delete a key that still has subkeys.
    #[error("key has subkeys: {0}")]
    KeyHasChildren(String),

    /// IO error from the operating system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the backing store.
    #[error("store error: {0}")]
    Backend(String),
}

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Top-level roots of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hive {
    /// `HKEY_LOCAL_MACHINE`
    LocalMachine,
    /// `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKEY_USERS`
    Users,
}

impl Hive {
    pub const ALL: [Hive; 3] = [Hive::LocalMachine, Hive::CurrentUser, Hive::Users];

    /// Short name, as shown by `reg.exe`.
    pub fn short_name(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
            Hive::Users => "HKU",
        }
    }

    /// Full predefined key name.
    pub fn name(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::Users => "HKEY_USERS",
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeValue {
    /// `REG_DWORD`
    Dword(u32),
    /// `REG_SZ`
    String(String),
}

impl TreeValue {
    pub fn as_dword(&self) -> Option<u32> {
        match self {
            TreeValue::Dword(v) => Some(*v),
            TreeValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TreeValue::String(s) => Some(s),
            TreeValue::Dword(_) => None,
        }
    }
}

/// A tree of named keys, each holding named values and child keys.
pub trait KeyTree {
    /// Handle to an open key.
    type Key;

    /// Opens the root key of a hive.
    fn open_hive(&self, hive: Hive) -> TreeResult<Self::Key>;

    /// Opens a direct child, returning `None` if it does not exist.
    fn open_child(
        &self,
        parent: &Self::Key,
        name: &str,
        writable: bool,
    ) -> TreeResult<Option<Self::Key>>;

    /// Opens a direct child for writing, creating it if needed.
    fn open_or_create_child(&self, parent: &Self::Key, name: &str) -> TreeResult<Self::Key>;

    /// Deletes a direct child. Fails if the child has children of its own.
    fn delete_child(&self, parent: &Self::Key, name: &str) -> TreeResult<()>;

    fn get_value(&self, key: &Self::Key, name: &str) -> TreeResult<Option<TreeValue>>;

    /// Writes a value, replacing any existing value with the same name.
    fn set_value(&self, key: &Self::Key, name: &str, value: &TreeValue) -> TreeResult<()>;

    fn delete_value(&self, key: &Self::Key, name: &str) -> TreeResult<()>;

    fn value_names(&self, key: &Self::Key) -> TreeResult<Vec<String>>;

    fn child_names(&self, key: &Self::Key) -> TreeResult<Vec<String>>;

    fn value_count(&self, key: &Self::Key) -> TreeResult<usize> {
        Ok(self.value_names(key)?.len())
    }

    fn child_count(&self, key: &Self::Key) -> TreeResult<usize> {
        Ok(self.child_names(key)?.len())
    }

    /// Opens a backslash-separated path below `key`.
    fn open_relative(
        &self,
        key: &Self::Key,
        path: &str,
        writable: bool,
    ) -> TreeResult<Option<Self::Key>> {
        let segments: Vec<&str> = split_path(path).collect();
        if segments.is_empty() {
            return Err(TreeError::KeyNotFound(path.to_string()));
        }

        // Only the last key is opened with write access.
        let mut current: Option<Self::Key> = None;
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let parent = current.as_ref().unwrap_or(key);
            match self.open_child(parent, segment, writable && last)? {
                Some(child) => current = Some(child),
                None => return Ok(None),
            }
        }

        Ok(current)
    }

    /// Opens a backslash-separated path below a hive.
    fn open_path(&self, hive: Hive, path: &str, writable: bool) -> TreeResult<Option<Self::Key>> {
        let root = self.open_hive(hive)?;
        self.open_relative(&root, path, writable)
    }

    /// Opens a backslash-separated path below a hive, creating missing keys.
    fn create_path(&self, hive: Hive, path: &str) -> TreeResult<Self::Key> {
        let mut current = self.open_hive(hive)?;
        for segment in split_path(path) {
            current = self.open_or_create_child(&current, segment)?;
        }
        Ok(current)
    }
}

/// Splits a registry path into its non-empty segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|segment| !segment.is_empty())
}
