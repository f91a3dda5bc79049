//! Locating the `ZoneMap\Domains` key.
//!
//! IE reads site-to-zone assignments from one of several places. Group
//! policy locations win when they carry `ListBox_Support_ZoneMapKey = 1`,
//! checked in this order:
//!
//! 1. `HKLM\Software\Policies\...\Internet Settings`
//! 2. `HKU\<SID>\Software\Policies\...\Internet Settings`
//! 3. `HKCU\Software\Policies\...\Internet Settings`
//!
//! Otherwise the per-user default under
//! `HKCU\Software\Microsoft\Windows\CurrentVersion\Internet Settings` is used,
//! created if missing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identity::UserIdentity;
use crate::tree::{Hive, KeyTree, TreeValue};

/// Policy branch of Internet Settings.
pub const POLICIES_PATH: &str = r"Software\Policies\Microsoft\Windows\CurrentVersion\Internet Settings";

/// Per-user default branch of Internet Settings.
pub const DEFAULT_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Internet Settings";

/// Site tree below an Internet Settings key.
pub const DOMAINS_PATH: &str = r"ZoneMap\Domains";

/// Policy value enabling the site-to-zone assignment list.
pub const SITE_TO_ZONE_FLAG: &str = "ListBox_Support_ZoneMapKey";

/// Flag value meaning "enabled".
pub const SITE_TO_ZONE_ENABLED: u32 = 1;

/// Where the Domains key was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ZoneMapLocation {
    /// Machine-wide group policy.
    MachinePolicy,
    /// Per-user group policy, addressed by SID.
    UserPolicy { sid: String },
    /// Per-user group policy under `HKCU`.
    CurrentUserPolicy,
    /// Per-user settings (no policy in force).
    CurrentUserDefault,
}

impl ZoneMapLocation {
    /// Hive and path of the Internet Settings key for this location.
    pub fn settings_path(&self) -> (Hive, String) {
        match self {
            Self::MachinePolicy => (Hive::LocalMachine, POLICIES_PATH.to_string()),
            Self::UserPolicy { sid } => (Hive::Users, format!(r"{sid}\{POLICIES_PATH}")),
            Self::CurrentUserPolicy => (Hive::CurrentUser, POLICIES_PATH.to_string()),
            Self::CurrentUserDefault => (Hive::CurrentUser, DEFAULT_PATH.to_string()),
        }
    }

    /// Full path of the Domains key for this location.
    pub fn domains_path(&self) -> String {
        let (hive, path) = self.settings_path();
        format!(r"{hive}\{path}\{DOMAINS_PATH}")
    }

    pub fn is_policy(&self) -> bool {
        !matches!(self, Self::CurrentUserDefault)
    }
}

impl fmt::Display for ZoneMapLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domains_path())
    }
}

/// An open Domains key and where it came from.
pub struct DomainsRoot<K> {
    pub key: K,
    pub location: ZoneMapLocation,
}

/// Resolves the Domains key the zone map currently lives under.
pub fn locate<T: KeyTree>(tree: &T, identity: &dyn UserIdentity) -> Result<DomainsRoot<T::Key>> {
    let mut candidates = vec![ZoneMapLocation::MachinePolicy];
    match identity.user_sid() {
        Ok(sid) => candidates.push(ZoneMapLocation::UserPolicy { sid }),
        Err(e) => warn!("Skipping per-user policy zone map: {}", e),
    }
    candidates.push(ZoneMapLocation::CurrentUserPolicy);

    for location in candidates {
        if let Some(key) = open_if_enabled(tree, &location)? {
            info!("Using policy zone map at {}", location);
            return Ok(DomainsRoot { key, location });
        }
    }

    let location = ZoneMapLocation::CurrentUserDefault;
    let (hive, path) = location.settings_path();
    let key = tree.create_path(hive, &format!(r"{path}\{DOMAINS_PATH}"))?;
    info!("Using zone map at {}", location);

    Ok(DomainsRoot { key, location })
}

fn open_if_enabled<T: KeyTree>(tree: &T, location: &ZoneMapLocation) -> Result<Option<T::Key>> {
    let (hive, path) = location.settings_path();
    let Some(settings) = tree.open_path(hive, &path, false)? else {
        debug!("No Internet Settings at {}\\{}", hive, path);
        return Ok(None);
    };

    let enabled = matches!(
        tree.get_value(&settings, SITE_TO_ZONE_FLAG)?,
        Some(TreeValue::Dword(SITE_TO_ZONE_ENABLED))
    );
    if !enabled {
        debug!("Site-to-zone list not enabled at {}\\{}", hive, path);
        return Ok(None);
    }

    Ok(tree.open_relative(&settings, DOMAINS_PATH, true)?)
}
