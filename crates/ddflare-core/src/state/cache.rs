// # Last-Set Cache
//
// In-memory record of the address this process last confirmed for each FQDN.
//
// ## Purpose
//
// Lets the reconciler skip a network round-trip when it already confirmed
// the desired state during this run. It is never authoritative over the
// provider: an empty entry always falls back to a live check.
//
// ## Ownership
//
// The cache is plain owned state. A reconciler takes it by value and hands
// it back with `Reconciler::into_cache()`, so independent reconcilers never
// share a map and no locking is involved.
//
// ## Crash Behavior
//
// Nothing is persisted. After a restart the first cycle always consults
// the provider (or the resolver, in check mode).

use std::collections::HashMap;
use std::net::IpAddr;

/// A confirmed address for one FQDN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The last confirmed IP address
    pub ip: IpAddr,
    /// When it was confirmed
    pub confirmed_at: chrono::DateTime<chrono::Utc>,
}

/// FQDN → last confirmed IP
///
/// # Example
///
/// ```rust
/// use ddflare_core::state::LastSetCache;
/// use std::net::IpAddr;
///
/// let mut cache = LastSetCache::new();
/// let ip: IpAddr = "203.0.113.9".parse().unwrap();
///
/// cache.record("host.example.com", ip);
/// assert!(cache.is_current("host.example.com", ip));
/// assert_eq!(cache.get("host.example.com"), Some(ip));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LastSetCache {
    entries: HashMap<String, CacheEntry>,
}

impl LastSetCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Last confirmed IP for `fqdn`
    pub fn get(&self, fqdn: &str) -> Option<IpAddr> {
        self.entries.get(fqdn).map(|entry| entry.ip)
    }

    /// Full entry for `fqdn`
    pub fn entry(&self, fqdn: &str) -> Option<&CacheEntry> {
        self.entries.get(fqdn)
    }

    /// True if `fqdn` was last confirmed at exactly `ip`
    pub fn is_current(&self, fqdn: &str, ip: IpAddr) -> bool {
        self.get(fqdn) == Some(ip)
    }

    /// Store `ip` as confirmed for `fqdn`, overwriting any previous entry
    pub fn record(&mut self, fqdn: &str, ip: IpAddr) {
        self.entries.insert(
            fqdn.to_string(),
            CacheEntry {
                ip,
                confirmed_at: chrono::Utc::now(),
            },
        );
    }

    /// Forget `fqdn`
    pub fn invalidate(&mut self, fqdn: &str) {
        self.entries.remove(fqdn);
    }

    /// Number of cached FQDNs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
