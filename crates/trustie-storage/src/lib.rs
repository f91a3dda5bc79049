//! TrustIE Storage - SQLite-backed key tree.
//!
//! Off Windows there is no registry to edit, so the zone map is kept in an
//! SQLite database laid out like one: three hive roots, keys nested under
//! them, and `REG_DWORD`/`REG_SZ` values on each key.
//!
//! # Example
//!
//! ```no_run
//! use trustie_core::{FixedIdentity, Site, TrustedSites, Zone};
//! use trustie_storage::SqliteTree;
//!
//! let tree = SqliteTree::new().unwrap();
//! let sites = TrustedSites::open(tree, &FixedIdentity::anonymous()).unwrap();
//!
//! let site: Site = "https://intranet.example.com".parse().unwrap();
//! sites.add(&site, Zone::Intranet).unwrap();
//! ```

pub mod error;
pub mod repository;
mod schema;
mod tree;

pub use error::{Result, StorageError};
pub use tree::{SqliteTree, TreeKey};
