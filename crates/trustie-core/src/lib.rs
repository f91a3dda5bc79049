//! TrustIE Core - site allow-list editing for Internet Explorer and Java.
//!
//! This crate provides:
//!
//! - Site parsing against the public suffix list ([`site`])
//! - A hierarchical key-value store abstraction ([`tree`])
//! - Resolution of the IE `ZoneMap\Domains` key ([`zone_map`])
//! - Add/delete/list of zone assignments ([`trusted_sites`])
//! - The Java `exception.sites` list ([`java`])
//!
//! # Example
//!
//! ```
//! use trustie_core::identity::FixedIdentity;
//! use trustie_core::tree::MemoryTree;
//! use trustie_core::{Site, TrustedSites, Zone};
//!
//! let sites = TrustedSites::open(MemoryTree::new(), &FixedIdentity::anonymous()).unwrap();
//! let site: Site = "https://portal.example.co.uk".parse().unwrap();
//!
//! sites.add(&site, Zone::Trusted).unwrap();
//! assert_eq!(sites.query(Zone::Trusted).unwrap(), vec![site.clone()]);
//!
//! sites.delete(&site).unwrap();
//! assert!(sites.query(Zone::Trusted).unwrap().is_empty());
//! ```

pub mod error;
pub mod identity;
pub mod java;
pub mod settings;
pub mod site;
pub mod tree;
pub mod trusted_sites;
pub mod zone;
pub mod zone_map;

pub use error::{Result, TrustieError};
pub use identity::{FixedIdentity, UserIdentity};
pub use java::{java_home, ExceptionSites, JavaRuntime};
pub use settings::{SecuritySettings, SiteStore, StoreKind};
pub use site::{DomainParser, DomainParts, PublicSuffixList, Site};
pub use tree::{Hive, KeyTree, TreeError, TreeValue};
pub use trusted_sites::TrustedSites;
pub use zone::Zone;
pub use zone_map::ZoneMapLocation;

#[cfg(target_os = "windows")]
pub use identity::DesktopUser;
#[cfg(target_os = "windows")]
pub use tree::RegistryTree;
