//! Primary-domain extraction and the seen-URL registry.
//!
//! The crawl is confined to one primary domain, determined from the seed
//! host. The extractor is an ordered suffix table, not a full public-suffix
//! list: the specific multi-label suffixes come first, the generic two-letter
//! fallback last, and the first match wins.

use dashmap::DashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("the host is empty")]
    EmptyHost,
    #[error("unrecognized host: {0}")]
    UnrecognizedHost(String),
}

static IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4]\d|[01]?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d?\d)$")
        .expect("ip regex")
});

// Ordered: specific second-level suffixes first, the bare two-letter
// fallback last. The first match decides the suffix boundary.
static DOMAIN_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\.(com|com\.\w{2})$",
        r"\.(gov|gov\.\w{2})$",
        r"\.(net|net\.\w{2})$",
        r"\.(org|org\.\w{2})$",
        r"\.me$",
        r"\.biz$",
        r"\.info$",
        r"\.name$",
        r"\.mobi$",
        r"\.so$",
        r"\.asia$",
        r"\.tel$",
        r"\.tv$",
        r"\.cc$",
        r"\.(co|co\.\w{2})$",
        r"\.\w{2}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("domain suffix regex"))
    .collect()
});

/// Extracts the registrable domain (approximate eTLD+1) from a host string.
///
/// IPv4 hosts are returned verbatim. Hosts matching none of the suffix
/// patterns are rejected.
pub fn primary_domain(host: &str) -> Result<String, DomainError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(DomainError::EmptyHost);
    }
    if IP_RE.is_match(host) {
        return Ok(host.to_string());
    }
    let suffix_index = DOMAIN_RES
        .iter()
        .find_map(|re| re.find(host))
        .map(|m| m.start())
        .unwrap_or(0);
    if suffix_index == 0 {
        return Err(DomainError::UnrecognizedHost(host.to_string()));
    }
    let head = &host[..suffix_index];
    let pd_index = head.rfind('.').map(|i| i + 1).unwrap_or(0);
    Ok(host[pd_index..].to_string())
}

/// The set of URL strings already scheduled in this run. Never shrinks.
#[derive(Debug, Default)]
pub struct UrlRegistry {
    seen: DashSet<String>,
}

impl UrlRegistry {
    pub fn new() -> Self {
        UrlRegistry::default()
    }

    /// Records a URL. Returns `false` if it was already present; at most one
    /// caller ever observes `true` for a given URL.
    pub fn insert(&self, url: &str) -> bool {
        self.seen.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_common_hosts() {
        assert_eq!(primary_domain("www.example.com").unwrap(), "example.com");
        assert_eq!(primary_domain("a.b.example.co.uk").unwrap(), "example.co.uk");
        assert_eq!(primary_domain("example.tv").unwrap(), "example.tv");
        assert_eq!(primary_domain("news.example.com.cn").unwrap(), "example.com.cn");
        assert_eq!(primary_domain("deep.sub.example.de").unwrap(), "example.de");
    }

    #[test]
    fn ip_hosts_pass_through() {
        assert_eq!(primary_domain("10.0.0.1").unwrap(), "10.0.0.1");
        assert_eq!(primary_domain("255.255.255.255").unwrap(), "255.255.255.255");
        // not a dotted quad
        assert!(primary_domain("10.0.0.256").is_err());
    }

    #[test]
    fn unknown_hosts_are_rejected() {
        assert_eq!(
            primary_domain("localhost").unwrap_err(),
            DomainError::UnrecognizedHost("localhost".to_string())
        );
        assert_eq!(primary_domain("  ").unwrap_err(), DomainError::EmptyHost);
    }

    #[test]
    fn extraction_is_idempotent() {
        for host in ["www.example.com", "a.b.example.co.uk", "example.tv", "10.0.0.1"] {
            let pd = primary_domain(host).unwrap();
            assert_eq!(primary_domain(&pd).unwrap(), pd);
        }
    }

    #[test]
    fn registry_admits_each_url_once() {
        let registry = UrlRegistry::new();
        assert!(registry.insert("http://example.com/a"));
        assert!(!registry.insert("http://example.com/a"));
        assert!(registry.contains("http://example.com/a"));
        assert!(!registry.contains("http://example.com/b"));
        assert_eq!(registry.len(), 1);
    }
}
