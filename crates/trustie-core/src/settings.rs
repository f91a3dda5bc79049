//! The allow-list contract shared by the IE and Java stores.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustieError};
use crate::java::ExceptionSites;
use crate::tree::KeyTree;
use crate::trusted_sites::TrustedSites;

/// A list of sites the user can view and edit.
pub trait SecuritySettings {
    /// Every entry, in presentation order.
    fn query_sites(&self) -> Result<Vec<String>>;

    fn add_site(&self, site: &str) -> Result<()>;

    /// Removes `site`, returning whether anything was removed.
    fn delete_site(&self, site: &str) -> Result<bool>;
}

/// Which allow-list to edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// IE zone map.
    #[default]
    InternetExplorer,
    /// Java `exception.sites`.
    Java,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::InternetExplorer => "internet_explorer",
            StoreKind::Java => "java",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ie" | "internet_explorer" | "internet-explorer" => Some(StoreKind::InternetExplorer),
            "java" => Some(StoreKind::Java),
            _ => None,
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = TrustieError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| TrustieError::InvalidStore(s.to_string()))
    }
}

/// One of the two allow-lists, selected at runtime.
pub enum SiteStore<T: KeyTree> {
    InternetExplorer(TrustedSites<T>),
    Java(ExceptionSites),
}

impl<T: KeyTree> SiteStore<T> {
    pub fn kind(&self) -> StoreKind {
        match self {
            SiteStore::InternetExplorer(_) => StoreKind::InternetExplorer,
            SiteStore::Java(_) => StoreKind::Java,
        }
    }

    fn inner(&self) -> &dyn SecuritySettings {
        match self {
            SiteStore::InternetExplorer(sites) => sites,
            SiteStore::Java(list) => list,
        }
    }
}

impl<T: KeyTree> SecuritySettings for SiteStore<T> {
    fn query_sites(&self) -> Result<Vec<String>> {
        self.inner().query_sites()
    }

    fn add_site(&self, site: &str) -> Result<()> {
        self.inner().add_site(site)
    }

    fn delete_site(&self, site: &str) -> Result<bool> {
        self.inner().delete_site(site)
    }
}
