//! Internet Explorer security zones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrustieError;

/// Security zone a site is assigned to.
///
/// The discriminants are the integers IE stores under `ZoneMap\Domains`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Local machine zone.
    MyComputer,
    /// Local intranet.
    Intranet,
    /// Trusted sites.
    #[default]
    Trusted,
    /// Internet.
    Internet,
    /// Restricted sites.
    Untrusted,
}

impl Zone {
    /// All zones, ordered by id.
    pub const ALL: [Zone; 5] = [
        Zone::MyComputer,
        Zone::Intranet,
        Zone::Trusted,
        Zone::Internet,
        Zone::Untrusted,
    ];

    /// Returns the registry id of this zone.
    pub fn id(self) -> u32 {
        match self {
            Zone::MyComputer => 0,
            Zone::Intranet => 1,
            Zone::Trusted => 2,
            Zone::Internet => 3,
            Zone::Untrusted => 4,
        }
    }

    /// Looks up a zone by registry id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|zone| zone.id() == id)
    }

    /// Returns the zone name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::MyComputer => "my_computer",
            Zone::Intranet => "intranet",
            Zone::Trusted => "trusted",
            Zone::Internet => "internet",
            Zone::Untrusted => "untrusted",
        }
    }

    /// Parses a zone from a name or a numeric id.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if let Ok(id) = s.parse::<u32>() {
            return Self::from_id(id);
        }

        match s.replace('-', "_").as_str() {
            "my_computer" | "local" | "computer" => Some(Zone::MyComputer),
            "intranet" | "local_intranet" => Some(Zone::Intranet),
            "trusted" | "trusted_sites" => Some(Zone::Trusted),
            "internet" => Some(Zone::Internet),
            "untrusted" | "restricted" | "restricted_sites" => Some(Zone::Untrusted),
            _ => None,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = TrustieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TrustieError::InvalidZone(s.to_string()))
    }
}
