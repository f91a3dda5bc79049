//! Site-to-zone assignments in the IE zone map.
//!
//! Sites are stored as a two-level tree under the Domains key:
//!
//! ```text
//! Domains\
//!   example.com\            root domain
//!     https = 2             *.example.com over https, Trusted
//!     portal\               subdomain
//!       * = 2               portal.example.com, any protocol, Trusted
//! ```
//!
//! Every edit leaves the tree without empty keys: removing the last value of
//! a subdomain removes the subdomain key, and a root-domain key that ends up
//! with neither values nor subkeys is removed as well.

use tracing::{debug, info};

use crate::error::{Result, TrustieError};
use crate::identity::UserIdentity;
use crate::settings::SecuritySettings;
use crate::site::{Site, ANY_PROTOCOL};
use crate::tree::{KeyTree, TreeValue};
use crate::zone::Zone;
use crate::zone_map::{self, ZoneMapLocation};

/// Add/delete/list sites in the zone map.
///
/// The Domains key is resolved once, on construction, and held for the
/// lifetime of the value.
pub struct TrustedSites<T: KeyTree> {
    tree: T,
    domains: T::Key,
    location: ZoneMapLocation,
    zone: Zone,
}

impl<T: KeyTree> TrustedSites<T> {
    /// Resolves the Domains key in `tree` and opens it.
    pub fn open(tree: T, identity: &dyn UserIdentity) -> Result<Self> {
        let root = zone_map::locate(&tree, identity)?;
        Ok(Self {
            tree,
            domains: root.key,
            location: root.location,
            zone: Zone::default(),
        })
    }

    /// Uses an already open Domains key.
    pub fn with_domains(tree: T, domains: T::Key, location: ZoneMapLocation) -> Self {
        Self {
            tree,
            domains,
            location,
            zone: Zone::default(),
        }
    }

    /// Sets the zone used by the [`SecuritySettings`] methods.
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn location(&self) -> &ZoneMapLocation {
        &self.location
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Assigns `site` to `zone`, overwriting any previous assignment.
    pub fn add(&self, site: &Site, zone: Zone) -> Result<()> {
        if site.root_domain().is_empty() {
            return Err(TrustieError::UnresolvableDomain(site.to_string()));
        }

        let root = self
            .tree
            .open_or_create_child(&self.domains, site.root_domain())?;
        let value = TreeValue::Dword(zone.id());

        match site.subdomain() {
            None => self.tree.set_value(&root, site.value_name(), &value)?,
            Some(subdomain) => {
                let sub = self.tree.open_or_create_child(&root, subdomain)?;
                self.tree.set_value(&sub, site.value_name(), &value)?;
            }
        }

        info!("Added {} to {} zone", site, zone);
        Ok(())
    }

    /// Removes `site` from whatever zone it is assigned to.
    ///
    /// Returns whether a value was removed; missing keys or values make
    /// this a no-op.
    pub fn delete(&self, site: &Site) -> Result<bool> {
        let value = site.value_name();
        let Some(root) = self
            .tree
            .open_child(&self.domains, site.root_domain(), true)?
        else {
            debug!("{} not present: no {} key", site, site.root_domain());
            return Ok(false);
        };

        let Some(subdomain) = site.subdomain() else {
            if !self.has_value(&root, value)? {
                debug!("{} not present: no {} value", site, value);
                return Ok(false);
            }
            if self.tree.value_count(&root)? > 1 || self.tree.child_count(&root)? > 0 {
                self.tree.delete_value(&root, value)?;
            } else {
                self.tree.delete_child(&self.domains, site.root_domain())?;
            }
            info!("Deleted {}", site);
            return Ok(true);
        };

        let Some(sub) = self.tree.open_child(&root, subdomain, true)? else {
            debug!("{} not present: no {} key", site, subdomain);
            return Ok(false);
        };
        if !self.has_value(&sub, value)? {
            debug!("{} not present: no {} value", site, value);
            return Ok(false);
        }

        if self.tree.value_count(&sub)? > 1 || self.tree.child_count(&sub)? > 0 {
            self.tree.delete_value(&sub, value)?;
        } else {
            self.tree.delete_child(&root, subdomain)?;
        }

        // Collapse the root-domain key if that was its last entry.
        if let Some(root) = self
            .tree
            .open_child(&self.domains, site.root_domain(), true)?
        {
            if self.tree.child_count(&root)? == 0 && self.tree.value_count(&root)? == 0 {
                self.tree.delete_child(&self.domains, site.root_domain())?;
                debug!("Removed empty {} key", site.root_domain());
            }
        }

        info!("Deleted {}", site);
        Ok(true)
    }

    /// Lists every site assigned to `zone`, sorted by canonical form.
    pub fn query(&self, zone: Zone) -> Result<Vec<Site>> {
        let mut sites = Vec::new();

        for root_domain in self.tree.child_names(&self.domains)? {
            let Some(root) = self.tree.open_child(&self.domains, &root_domain, false)? else {
                continue;
            };

            for value in self.zone_value_names(&root, zone)? {
                sites.push(Site::new(protocol_of(&value), None::<String>, root_domain.as_str()));
            }

            for subdomain in self.tree.child_names(&root)? {
                let Some(sub) = self.tree.open_child(&root, &subdomain, false)? else {
                    continue;
                };
                for value in self.zone_value_names(&sub, zone)? {
                    sites.push(Site::new(
                        protocol_of(&value),
                        Some(subdomain.as_str()),
                        root_domain.as_str(),
                    ));
                }
            }
        }

        sites.sort_by_cached_key(|site| site.to_string());
        Ok(sites)
    }

    /// Paths of keys below Domains holding neither values nor subkeys.
    ///
    /// Always empty after [`add`](Self::add) and [`delete`](Self::delete).
    pub fn empty_keys(&self) -> Result<Vec<String>> {
        let mut empty = Vec::new();
        self.collect_empty(&self.domains, String::new(), &mut empty)?;
        Ok(empty)
    }

    fn collect_empty(&self, key: &T::Key, path: String, empty: &mut Vec<String>) -> Result<()> {
        for name in self.tree.child_names(key)? {
            let child_path = if path.is_empty() {
                name.clone()
            } else {
                format!(r"{path}\{name}")
            };
            let Some(child) = self.tree.open_child(key, &name, false)? else {
                continue;
            };
            if self.tree.child_count(&child)? == 0 && self.tree.value_count(&child)? == 0 {
                empty.push(child_path.clone());
            }
            self.collect_empty(&child, child_path, empty)?;
        }
        Ok(())
    }

    fn has_value(&self, key: &T::Key, name: &str) -> Result<bool> {
        Ok(self
            .tree
            .value_names(key)?
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(name)))
    }

    /// Names of the values on `key` assigned to `zone`.
    fn zone_value_names(&self, key: &T::Key, zone: Zone) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for name in self.tree.value_names(key)? {
            match self.tree.get_value(key, &name)? {
                Some(TreeValue::Dword(id)) if id == zone.id() => names.push(name),
                Some(TreeValue::Dword(_)) => {}
                other => debug!("Skipping non-zone value {} ({:?})", name, other),
            }
        }
        Ok(names)
    }
}

fn protocol_of(value_name: &str) -> Option<&str> {
    (value_name != ANY_PROTOCOL).then_some(value_name)
}

impl<T: KeyTree> SecuritySettings for TrustedSites<T> {
    fn query_sites(&self) -> Result<Vec<String>> {
        Ok(self
            .query(self.zone)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    fn add_site(&self, site: &str) -> Result<()> {
        let site: Site = site.parse()?;
        self.add(&site, self.zone)
    }

    fn delete_site(&self, site: &str) -> Result<bool> {
        match site.parse::<Site>() {
            Ok(site) => self.delete(&site),
            Err(TrustieError::UnresolvableDomain(raw)) => {
                debug!("Nothing stored for unresolvable {:?}", raw);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedIdentity;
    use crate::tree::MemoryTree;

    fn sites() -> TrustedSites<MemoryTree> {
        TrustedSites::open(MemoryTree::new(), &FixedIdentity::anonymous()).unwrap()
    }

    fn site(raw: &str) -> Site {
        raw.parse().unwrap()
    }

    fn listed(sites: &TrustedSites<MemoryTree>, zone: Zone) -> Vec<String> {
        sites
            .query(zone)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn assert_no_empty_keys(sites: &TrustedSites<MemoryTree>) {
        assert_eq!(sites.empty_keys().unwrap(), Vec::<String>::new());
    }

    fn domains_children(sites: &TrustedSites<MemoryTree>) -> Vec<String> {
        sites.tree().child_names(&sites.domains).unwrap()
    }

    #[test]
    fn add_root_domain_writes_value_on_root_key() {
        let sites = sites();
        sites.add(&site("*.example.com"), Zone::Trusted).unwrap();

        let tree = sites.tree();
        let root = tree
            .open_child(&sites.domains, "example.com", false)
            .unwrap()
            .unwrap();
        assert_eq!(
            tree.get_value(&root, "*").unwrap(),
            Some(TreeValue::Dword(2))
        );
        assert_eq!(tree.child_count(&root).unwrap(), 0);
    }

    #[test]
    fn add_subdomain_writes_value_on_subkey() {
        let sites = sites();
        sites.add(&site("https://portal.example.com"), Zone::Trusted).unwrap();

        let tree = sites.tree();
        let root = tree
            .open_child(&sites.domains, "example.com", false)
            .unwrap()
            .unwrap();
        let sub = tree.open_child(&root, "portal", false).unwrap().unwrap();
        assert_eq!(tree.value_count(&root).unwrap(), 0);
        assert_eq!(
            tree.get_value(&sub, "https").unwrap(),
            Some(TreeValue::Dword(2))
        );
    }

    #[test]
    fn add_then_query_round_trip() {
        let sites = sites();
        let entry = site("http://sub.example.co.uk");
        sites.add(&entry, Zone::Trusted).unwrap();

        let listed = sites.query(Zone::Trusted).unwrap();
        assert_eq!(listed, vec![entry.clone()]);
        assert_eq!(listed[0].to_string(), "http://sub.example.co.uk");

        sites.delete(&entry).unwrap();
        assert!(sites.query(Zone::Trusted).unwrap().is_empty());
        assert!(domains_children(&sites).is_empty());
    }

    #[test]
    fn add_is_idempotent() {
        let sites = sites();
        let entry = site("https://*.example.com");
        sites.add(&entry, Zone::Trusted).unwrap();
        sites.add(&entry, Zone::Trusted).unwrap();

        assert_eq!(listed(&sites, Zone::Trusted), ["https://*.example.com"]);
        let root = sites
            .tree()
            .open_child(&sites.domains, "example.com", false)
            .unwrap()
            .unwrap();
        assert_eq!(sites.tree().value_count(&root).unwrap(), 1);
    }

    #[test]
    fn add_moves_site_between_zones() {
        let sites = sites();
        let entry = site("x.example.com");
        sites.add(&entry, Zone::Trusted).unwrap();
        sites.add(&entry, Zone::Untrusted).unwrap();

        assert!(listed(&sites, Zone::Trusted).is_empty());
        assert_eq!(listed(&sites, Zone::Untrusted), ["x.example.com"]);
    }

    #[test]
    fn add_rejects_empty_root_domain() {
        let sites = sites();
        let entry = Site::new(None::<&str>, None::<&str>, "");
        assert!(matches!(
            sites.add(&entry, Zone::Trusted),
            Err(TrustieError::UnresolvableDomain(_))
        ));
        assert!(domains_children(&sites).is_empty());
    }

    #[test]
    fn query_filters_by_zone() {
        let sites = sites();
        sites.add(&site("a.example.com"), Zone::Trusted).unwrap();
        sites.add(&site("b.example.com"), Zone::Untrusted).unwrap();
        sites.add(&site("*.other.com"), Zone::Intranet).unwrap();

        assert_eq!(listed(&sites, Zone::Trusted), ["a.example.com"]);
        assert_eq!(listed(&sites, Zone::Untrusted), ["b.example.com"]);
        assert_eq!(listed(&sites, Zone::Intranet), ["*.other.com"]);
        assert!(listed(&sites, Zone::Internet).is_empty());
    }

    #[test]
    fn query_sorts_by_canonical_string() {
        let sites = sites();
        sites.add(&site("x.gamma.com"), Zone::Trusted).unwrap();
        sites.add(&site("http://*.beta.com"), Zone::Trusted).unwrap();
        sites.add(&site("*.alpha.com"), Zone::Trusted).unwrap();

        assert_eq!(
            listed(&sites, Zone::Trusted),
            ["*.alpha.com", "http://*.beta.com", "x.gamma.com"]
        );
    }

    #[test]
    fn query_skips_non_dword_values() {
        let sites = sites();
        sites.add(&site("*.example.com"), Zone::Trusted).unwrap();
        let root = sites
            .tree()
            .open_child(&sites.domains, "example.com", false)
            .unwrap()
            .unwrap();
        sites
            .tree()
            .set_value(&root, "ftp", &TreeValue::String("2".into()))
            .unwrap();

        assert_eq!(listed(&sites, Zone::Trusted), ["*.example.com"]);
    }

    #[test]
    fn delete_collapses_subdomain_and_root() {
        let sites = sites();
        let entry = site("x.example.com");
        sites.add(&entry, Zone::Trusted).unwrap();

        assert!(sites.delete(&entry).unwrap());
        assert!(domains_children(&sites).is_empty());
        assert_no_empty_keys(&sites);
    }

    #[test]
    fn delete_preserves_sibling_subdomain() {
        let sites = sites();
        sites.add(&site("http://x.a.com"), Zone::Trusted).unwrap();
        sites.add(&site("https://y.a.com"), Zone::Trusted).unwrap();

        sites.delete(&site("http://x.a.com")).unwrap();

        assert_eq!(listed(&sites, Zone::Trusted), ["https://y.a.com"]);
        let root = sites
            .tree()
            .open_child(&sites.domains, "a.com", false)
            .unwrap()
            .unwrap();
        assert_eq!(sites.tree().child_names(&root).unwrap(), ["y"]);
        assert_no_empty_keys(&sites);
    }

    #[test]
    fn delete_one_protocol_keeps_others() {
        let sites = sites();
        sites.add(&site("http://x.a.com"), Zone::Trusted).unwrap();
        sites.add(&site("https://x.a.com"), Zone::Trusted).unwrap();

        sites.delete(&site("http://x.a.com")).unwrap();
        assert_eq!(listed(&sites, Zone::Trusted), ["https://x.a.com"]);
        assert_no_empty_keys(&sites);
    }

    #[test]
    fn delete_root_value_keeps_subdomains() {
        let sites = sites();
        sites.add(&site("*.a.com"), Zone::Trusted).unwrap();
        sites.add(&site("x.a.com"), Zone::Trusted).unwrap();

        sites.delete(&site("*.a.com")).unwrap();
        assert_eq!(listed(&sites, Zone::Trusted), ["x.a.com"]);
        assert_no_empty_keys(&sites);

        sites.delete(&site("x.a.com")).unwrap();
        assert!(domains_children(&sites).is_empty());
    }

    #[test]
    fn delete_subdomain_keeps_root_value() {
        let sites = sites();
        sites.add(&site("*.a.com"), Zone::Trusted).unwrap();
        sites.add(&site("x.a.com"), Zone::Trusted).unwrap();

        sites.delete(&site("x.a.com")).unwrap();
        assert_eq!(listed(&sites, Zone::Trusted), ["*.a.com"]);
        assert_no_empty_keys(&sites);
    }

    #[test]
    fn delete_last_root_value_removes_key() {
        let sites = sites();
        sites.add(&site("http://*.a.com"), Zone::Trusted).unwrap();
        sites.add(&site("https://*.a.com"), Zone::Trusted).unwrap();

        assert!(sites.delete(&site("http://*.a.com")).unwrap());
        assert_eq!(domains_children(&sites), ["a.com"]);

        sites.delete(&site("https://*.a.com")).unwrap();
        assert!(domains_children(&sites).is_empty());
    }

    #[test]
    fn delete_missing_is_noop() {
        let sites = sites();
        sites.add(&site("http://x.a.com"), Zone::Trusted).unwrap();

        assert!(!sites.delete(&site("*.missing.com")).unwrap());
        assert!(!sites.delete(&site("y.a.com")).unwrap());
        assert!(!sites.delete(&site("https://x.a.com")).unwrap());
        assert!(!sites.delete(&site("*.a.com")).unwrap());

        assert_eq!(listed(&sites, Zone::Trusted), ["http://x.a.com"]);
        assert_no_empty_keys(&sites);
    }

    #[test]
    fn delete_removes_site_from_any_zone() {
        let sites = sites();
        sites.add(&site("x.a.com"), Zone::Untrusted).unwrap();
        assert!(sites.delete(&site("x.a.com")).unwrap());
        assert!(domains_children(&sites).is_empty());
    }

    #[test]
    fn no_empty_keys_after_mixed_sequence() {
        let sites = sites();
        let entries = [
            "*.a.com",
            "http://*.a.com",
            "x.a.com",
            "https://x.a.com",
            "y.a.com",
            "z.b.org",
            "https://*.b.org",
            "deep.x.c.net",
        ];
        for raw in entries {
            sites.add(&site(raw), Zone::Trusted).unwrap();
            assert_no_empty_keys(&sites);
        }
        for raw in entries.iter().rev().step_by(2) {
            sites.delete(&site(raw)).unwrap();
            assert_no_empty_keys(&sites);
        }
        for raw in entries {
            sites.delete(&site(raw)).unwrap();
            assert_no_empty_keys(&sites);
        }
        assert!(domains_children(&sites).is_empty());
    }

    #[test]
    fn security_settings_uses_configured_zone() {
        let sites = sites().with_zone(Zone::Intranet);
        sites.add_site("intranet.example.com").unwrap();

        assert_eq!(sites.query_sites().unwrap(), ["intranet.example.com"]);
        assert!(listed(&sites, Zone::Trusted).is_empty());

        assert!(sites.delete_site("intranet.example.com").unwrap());
        assert!(!sites.delete_site("intranet.example.com").unwrap());
        assert!(sites.query_sites().unwrap().is_empty());
    }

    #[test]
    fn security_settings_rejects_unresolvable_add() {
        let sites = sites();
        assert!(sites.add_site("com").is_err());
        assert!(!sites.delete_site("com").unwrap());
    }
}
