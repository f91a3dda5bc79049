//! Core error types.

use thiserror::Error;

use crate::tree::TreeError;

/// Errors that can occur while editing site allow-lists.
#[derive(Debug, Error)]
pub enum TrustieError {
    /// The input does not resolve to a registrable domain.
    #[error("cannot resolve a registrable domain from {0:?}")]
    UnresolvableDomain(String),

    /// The input is not a well-formed site.
    #[error("invalid site {site:?}: {reason}")]
    InvalidSite { site: String, reason: String },

    /// Unknown security zone name or id.
    #[error("unknown security zone: {0}")]
    InvalidZone(String),

    /// Unknown site store name.
    #[error("unknown site store: {0}")]
    InvalidStore(String),

    /// Key tree (registry or embedded store) failure.
    #[error("key tree error: {0}")]
    Tree(#[from] TreeError),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The current user could not be identified.
    #[error("cannot identify current user: {0}")]
    Identity(String),

    /// No Java runtime is registered on this machine.
    #[error("Java runtime is not installed")]
    JavaNotInstalled,
}

impl TrustieError {
    pub(crate) fn invalid_site(site: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSite {
            site: site.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, TrustieError>;
