//! Site parsing.
//!
//! Turns user input such as `https://portal.example.co.uk/login`,
//! `*.example.com` or `intranet.example.org` into the three parts IE keeps
//! under `ZoneMap\Domains`:
//!
//! - protocol (`https`), stored as a value name, `*` when absent
//! - subdomain (`portal`), stored as a key under the root domain
//! - root domain (`example.co.uk`), the registrable domain per the public
//!   suffix list
//!
//! Splitting a host into subdomain and registrable domain is delegated to a
//! [`DomainParser`]. [`PublicSuffixList`] is the default, backed by the
//! list compiled into the `psl` crate.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustieError};

/// Value name used when a site has no specific protocol.
pub const ANY_PROTOCOL: &str = "*";

static HOST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{N}_-]{1,63}(\.[\p{L}\p{N}_-]{1,63})*$").expect("valid host regex")
});

static SCHEME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.-]*$").expect("valid scheme regex"));

// =============================================================================
// Domain Parsing Service
// =============================================================================

/// A host split into its registrable domain and whatever precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParts {
    /// Labels left of the registrable domain, `None` when there are none.
    pub subdomain: Option<String>,
    /// The registrable domain (eTLD+1).
    pub registrable: String,
}

/// Splits normalized hosts into subdomain and registrable domain.
pub trait DomainParser {
    /// Returns `None` when `host` has no registrable domain.
    fn split(&self, host: &str) -> Option<DomainParts>;
}

/// [`DomainParser`] backed by the compiled-in public suffix list.
///
/// Hosts under suffixes the list does not know are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicSuffixList;

impl DomainParser for PublicSuffixList {
    fn split(&self, host: &str) -> Option<DomainParts> {
        let domain = psl::domain(host.as_bytes())?;
        if !domain.suffix().is_known() {
            return None;
        }

        let registrable = std::str::from_utf8(domain.as_bytes()).ok()?.to_string();
        let subdomain = host
            .strip_suffix(registrable.as_str())
            .map(|rest| rest.trim_end_matches('.'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);

        Some(DomainParts {
            subdomain,
            registrable,
        })
    }
}

// =============================================================================
// Site
// =============================================================================

/// One allow-list entry, decomposed the way the zone map stores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    protocol: Option<String>,
    subdomain: Option<String>,
    root_domain: String,
}

impl Site {
    /// Creates a site from already decomposed parts.
    ///
    /// Empty strings are treated as absent.
    pub fn new(
        protocol: Option<impl Into<String>>,
        subdomain: Option<impl Into<String>>,
        root_domain: impl Into<String>,
    ) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            protocol: protocol.map(Into::into).and_then(non_empty),
            subdomain: subdomain.map(Into::into).and_then(non_empty),
            root_domain: root_domain.into(),
        }
    }

    /// Parses raw input using the given domain parser.
    pub fn parse(raw: &str, parser: &dyn DomainParser) -> Result<Self> {
        let (protocol, host) = normalize(raw)?;
        let parts = parser
            .split(&host)
            .ok_or_else(|| TrustieError::UnresolvableDomain(raw.trim().to_string()))?;

        Ok(Self {
            protocol,
            subdomain: parts.subdomain,
            root_domain: parts.registrable,
        })
    }

    /// Protocol, if the entry is limited to one.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Subdomain, if the entry does not cover the whole registrable domain.
    pub fn subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    /// Registrable domain.
    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn has_protocol(&self) -> bool {
        self.protocol.is_some()
    }

    pub fn has_subdomain(&self) -> bool {
        self.subdomain.is_some()
    }

    /// Name of the registry value holding this site's zone.
    pub fn value_name(&self) -> &str {
        self.protocol.as_deref().unwrap_or(ANY_PROTOCOL)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(protocol) = &self.protocol {
            write!(f, "{protocol}://")?;
        }
        match &self.subdomain {
            Some(subdomain) => write!(f, "{subdomain}.{}", self.root_domain),
            None => write!(f, "*.{}", self.root_domain),
        }
    }
}

impl FromStr for Site {
    type Err = TrustieError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, &PublicSuffixList)
    }
}

impl Ord for Site {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| self.root_domain.cmp(&other.root_domain))
            .then_with(|| self.subdomain.cmp(&other.subdomain))
            .then_with(|| self.protocol.cmp(&other.protocol))
    }
}

impl PartialOrd for Site {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Strips scheme, wildcard label, path, port and trailing dot.
///
/// Returns the lowercased protocol, if any, and the lowercased host.
fn normalize(raw: &str) -> Result<(Option<String>, String)> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(TrustieError::invalid_site(raw, "empty input"));
    }

    let mut rest = input;
    let mut protocol = None;
    // A `://` after the first `/`, `?` or `#` belongs to the path or query.
    let leading_scheme = rest
        .split_once("://")
        .filter(|(scheme, _)| !scheme.contains(['/', '?', '#']));
    if let Some((scheme, tail)) = leading_scheme {
        let scheme = scheme.to_ascii_lowercase();
        if !SCHEME_PATTERN.is_match(&scheme) {
            return Err(TrustieError::invalid_site(raw, "malformed scheme"));
        }
        protocol = Some(scheme);
        rest = tail;
    }

    if let Some(tail) = rest.strip_prefix("*.") {
        rest = tail;
    }

    if let Some(end) = rest.find(['/', '?', '#']) {
        rest = &rest[..end];
    }

    if let Some((host, port)) = rest.rsplit_once(':') {
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            rest = host;
        }
    }

    let rest = rest.strip_suffix('.').unwrap_or(rest);
    let host = rest.to_lowercase();

    if !HOST_PATTERN.is_match(&host) {
        return Err(TrustieError::invalid_site(raw, "malformed host"));
    }

    Ok((protocol, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Site {
        raw.parse().unwrap()
    }

    #[test]
    fn parse_protocol_subdomain_multi_part_suffix() {
        let site = parse("p://sub.example.co.uk");
        assert_eq!(site.protocol(), Some("p"));
        assert_eq!(site.subdomain(), Some("sub"));
        assert_eq!(site.root_domain(), "example.co.uk");
    }

    #[test]
    fn parse_wildcard_domain() {
        let site = parse("*.example.com");
        assert_eq!(site.protocol(), None);
        assert_eq!(site.subdomain(), None);
        assert_eq!(site.root_domain(), "example.com");
        assert_eq!(site.value_name(), ANY_PROTOCOL);
    }

    #[test]
    fn parse_wildcard_with_protocol() {
        let site = parse("https://*.example.com");
        assert_eq!(site.protocol(), Some("https"));
        assert_eq!(site.subdomain(), None);
        assert_eq!(site.to_string(), "https://*.example.com");
    }

    #[test]
    fn parse_strips_path_port_and_trailing_dot() {
        let site = parse("http://www.example.com:8080/index.html");
        assert_eq!(site.subdomain(), Some("www"));
        assert_eq!(site.root_domain(), "example.com");

        let site = parse("www.example.com.");
        assert_eq!(site.subdomain(), Some("www"));
        assert_eq!(site.root_domain(), "example.com");
    }

    #[test]
    fn parse_nested_subdomain() {
        let site = parse("a.b.example.com");
        assert_eq!(site.subdomain(), Some("a.b"));
        assert_eq!(site.root_domain(), "example.com");
    }

    #[test]
    fn parse_lowercases() {
        let site = parse("HTTPS://WWW.Example.COM");
        assert_eq!(site.to_string(), "https://www.example.com");
    }

    #[test]
    fn parse_rejects_bare_suffix() {
        assert!(matches!(
            "com".parse::<Site>(),
            Err(TrustieError::UnresolvableDomain(_))
        ));
        assert!(matches!(
            "*.co.uk".parse::<Site>(),
            Err(TrustieError::UnresolvableDomain(_))
        ));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(
            "".parse::<Site>(),
            Err(TrustieError::InvalidSite { .. })
        ));
        assert!(matches!(
            "exa mple.com".parse::<Site>(),
            Err(TrustieError::InvalidSite { .. })
        ));
        assert!(matches!(
            "a..example.com".parse::<Site>(),
            Err(TrustieError::InvalidSite { .. })
        ));
        assert!(matches!(
            "1http://example.com".parse::<Site>(),
            Err(TrustieError::InvalidSite { .. })
        ));
    }

    #[test]
    fn parse_ignores_scheme_inside_query() {
        let site = parse("www.example.com/login?next=https://other.org");
        assert_eq!(site.protocol(), None);
        assert_eq!(site.subdomain(), Some("www"));
        assert_eq!(site.root_domain(), "example.com");

        let site = parse("https://www.example.com/login?next=http://other.org");
        assert_eq!(site.protocol(), Some("https"));
        assert_eq!(site.root_domain(), "example.com");

        let site = parse("portal.example.com#view=ftp://files.example.net");
        assert_eq!(site.protocol(), None);
        assert_eq!(site.subdomain(), Some("portal"));
    }

    #[test]
    fn parse_uses_given_parser() {
        struct LastTwoLabels;

        impl DomainParser for LastTwoLabels {
            fn split(&self, host: &str) -> Option<DomainParts> {
                let labels: Vec<&str> = host.split('.').collect();
                if labels.len() < 2 {
                    return None;
                }
                let cut = labels.len() - 2;
                Some(DomainParts {
                    subdomain: (cut > 0).then(|| labels[..cut].join(".")),
                    registrable: labels[cut..].join("."),
                })
            }
        }

        let site = Site::parse("x.example.test", &LastTwoLabels).unwrap();
        assert_eq!(site.subdomain(), Some("x"));
        assert_eq!(site.root_domain(), "example.test");
        assert!(Site::parse("localhost", &LastTwoLabels).is_err());
    }

    #[test]
    fn display_canonical_forms() {
        assert_eq!(
            Site::new(None::<&str>, None::<&str>, "a.com").to_string(),
            "*.a.com"
        );
        assert_eq!(
            Site::new(Some("http"), None::<&str>, "a.com").to_string(),
            "http://*.a.com"
        );
        assert_eq!(
            Site::new(None::<&str>, Some("x"), "a.com").to_string(),
            "x.a.com"
        );
        assert_eq!(
            Site::new(Some("https"), Some("x"), "a.com").to_string(),
            "https://x.a.com"
        );
    }

    #[test]
    fn new_treats_empty_as_absent() {
        let site = Site::new(Some(""), Some(""), "a.com");
        assert!(!site.has_protocol());
        assert!(!site.has_subdomain());
    }

    #[test]
    fn ordering_follows_canonical_string() {
        let mut sites = vec![
            parse("x.gamma.com"),
            parse("http://*.beta.com"),
            parse("*.alpha.com"),
        ];
        sites.sort();

        let names: Vec<String> = sites.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["*.alpha.com", "http://*.beta.com", "x.gamma.com"]);
    }

    #[test]
    fn equality_compares_all_parts() {
        assert_eq!(parse("http://x.a.com"), parse("HTTP://x.a.com/path"));
        assert_ne!(parse("http://x.a.com"), parse("https://x.a.com"));
        assert_ne!(parse("x.a.com"), parse("y.a.com"));
    }
}
