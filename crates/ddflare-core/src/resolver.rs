//! Name handling and local DNS resolution
//!
//! - [`derive_zone`]: syntactic zone derivation (never a DNS lookup)
//! - [`resolve_host`]: lookup through the system resolver with a deadline
//!
//! Public IP discovery lives in the `ddflare-ip-http` crate, behind the
//! [`IpSource`](crate::traits::IpSource) trait.

use crate::error::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Default deadline for a single DNS lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Which address to pick when a lookup returns several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressPolicy {
    /// First address returned by the resolver, whatever its family
    First,
    /// First IPv4 address, falling back to the first address
    #[default]
    PreferIpv4,
    /// First IPv6 address, falling back to the first address
    PreferIpv6,
}

impl AddressPolicy {
    /// Pick an address from a lookup answer, `None` if the answer is empty
    pub fn select(self, addrs: &[IpAddr]) -> Option<IpAddr> {
        let preferred = match self {
            AddressPolicy::First => None,
            AddressPolicy::PreferIpv4 => addrs.iter().find(|ip| ip.is_ipv4()),
            AddressPolicy::PreferIpv6 => addrs.iter().find(|ip| ip.is_ipv6()),
        };

        preferred.or_else(|| addrs.first()).copied()
    }
}

/// Derive the zone of an FQDN: its last two labels
///
/// `a.b.example.com` → `example.com`. A single trailing root dot is ignored.
/// Names with fewer than two labels, or with an empty label among the last
/// two, are rejected.
pub fn derive_zone(fqdn: &str) -> Result<String> {
    let name = fqdn.strip_suffix('.').unwrap_or(fqdn);
    let labels: Vec<&str> = name.split('.').collect();

    if labels.len() < 2 {
        return Err(Error::invalid_name(
            fqdn,
            "at least two dot-separated labels are required to derive a zone",
        ));
    }

    let domain = labels[labels.len() - 2];
    let tld = labels[labels.len() - 1];
    if domain.is_empty() || tld.is_empty() {
        return Err(Error::invalid_name(fqdn, "empty label in zone part"));
    }

    Ok(format!("{}.{}", domain, tld))
}

/// Resolve `fqdn` with the default policy and deadline
pub async fn resolve_host(fqdn: &str) -> Result<IpAddr> {
    resolve_host_with(fqdn, AddressPolicy::default(), DEFAULT_LOOKUP_TIMEOUT).await
}

/// Resolve `fqdn` through the system resolver
///
/// Fails with [`Error::Resolution`] when the lookup errors, times out or
/// returns no address.
pub async fn resolve_host_with(
    fqdn: &str,
    policy: AddressPolicy,
    deadline: Duration,
) -> Result<IpAddr> {
    if fqdn.is_empty() {
        return Err(Error::resolution(fqdn, "empty name"));
    }

    let lookup = tokio::net::lookup_host((fqdn, 0));
    let addrs: Vec<IpAddr> = match tokio::time::timeout(deadline, lookup).await {
        Ok(Ok(iter)) => iter.map(|sa| sa.ip()).collect(),
        Ok(Err(e)) => return Err(Error::resolution(fqdn, e.to_string())),
        Err(_) => {
            return Err(Error::resolution(
                fqdn,
                format!("lookup timed out after {:?}", deadline),
            ));
        }
    };

    tracing::debug!("Resolved {} to {:?}", fqdn, addrs);

    policy
        .select(&addrs)
        .ok_or_else(|| Error::resolution(fqdn, "no address returned"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_is_last_two_labels() {
        assert_eq!(derive_zone("a.b.example.com").unwrap(), "example.com");
        assert_eq!(derive_zone("host.example.com").unwrap(), "example.com");
        assert_eq!(derive_zone("example.com").unwrap(), "example.com");
        assert_eq!(derive_zone("host.example.com.").unwrap(), "example.com");
    }

    #[test]
    fn zone_requires_two_labels() {
        assert!(matches!(derive_zone("localhost"), Err(Error::InvalidName { .. })));
        assert!(matches!(derive_zone(""), Err(Error::InvalidName { .. })));
        assert!(matches!(derive_zone("example."), Err(Error::InvalidName { .. })));
        assert!(matches!(derive_zone("host..com"), Err(Error::InvalidName { .. })));
    }

    #[test]
    fn policy_selection() {
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        let answer = [v6, v4];

        assert_eq!(AddressPolicy::First.select(&answer), Some(v6));
        assert_eq!(AddressPolicy::PreferIpv4.select(&answer), Some(v4));
        assert_eq!(AddressPolicy::PreferIpv6.select(&[v4, v6]), Some(v6));
        // Fallback when the preferred family is missing
        assert_eq!(AddressPolicy::PreferIpv4.select(&[v6]), Some(v6));
        assert_eq!(AddressPolicy::PreferIpv4.select(&[]), None);
    }

    #[tokio::test]
    async fn resolves_ip_literals_without_network() {
        let ip = resolve_host("127.0.0.1").await.unwrap();
        assert_eq!(ip, IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn ipv6_literal_with_first_policy() {
        let ip = tokio_test::block_on(resolve_host_with(
            "::1",
            AddressPolicy::First,
            Duration::from_secs(1),
        ));
        tokio_test::assert_ok!(&ip);
        assert_eq!(ip.unwrap(), "::1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn empty_name_is_a_resolution_error() {
        assert!(matches!(resolve_host("").await, Err(Error::Resolution { .. })));
    }
}
