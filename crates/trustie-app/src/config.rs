//! Application configuration.
//!
//! Read from `config.json` in the platform config directory. Every field is
//! optional; a missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trustie_core::{FixedIdentity, StoreKind, Zone};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Store used when a command has no `--store`.
    pub default_store: StoreKind,

    /// Zone used when a command has no `--zone`.
    pub zone: Zone,

    /// Use this `exception.sites` instead of the one in the user profile.
    pub exception_sites: Option<PathBuf>,

    /// Keep the zone map in this SQLite database.
    pub database: Option<PathBuf>,

    pub user_name: Option<String>,

    /// SID used to find the per-user policy location.
    pub user_sid: Option<String>,
}

impl AppConfig {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "trustie", "trustie").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from an explicit path, which must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from `path` if given, otherwise from the default location when present.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Identity configured for this user, if any.
    pub fn identity(&self) -> Option<FixedIdentity> {
        if self.user_name.is_none() && self.user_sid.is_none() {
            return None;
        }
        Some(FixedIdentity::new(
            self.user_name.clone(),
            self.user_sid.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trustie_core::UserIdentity;

    #[test]
    fn empty_object_is_default() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_store, StoreKind::InternetExplorer);
        assert_eq!(config.zone, Zone::Trusted);
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{
                "default_store": "java",
                "zone": "intranet",
                "exception_sites": "/tmp/exception.sites",
                "user_sid": "S-1-5-21-1-2-3-1001"
            }"#,
        )
        .unwrap();

        let config = AppConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.default_store, StoreKind::Java);
        assert_eq!(config.zone, Zone::Intranet);
        assert_eq!(
            config.exception_sites,
            Some(PathBuf::from("/tmp/exception.sites"))
        );
        assert_eq!(config.database, None);

        let identity = config.identity().unwrap();
        assert_eq!(identity.user_sid().unwrap(), "S-1-5-21-1-2-3-1001");
        assert!(identity.user_name().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load_or_default(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "zone": "moon" }"#).unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn no_identity_without_overrides() {
        assert!(AppConfig::default().identity().is_none());
    }
}
