// # IP Source Trait
//
// Defines how the reconciliation loop learns the address the record should
// point at when no explicit address is configured.
//
// ## Implementations
//
// - HTTP IP-echo service: `ddflare-ip-http` crate

use async_trait::async_trait;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Version of the given address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// DNS address record type for this version
    pub fn record_type(self) -> &'static str {
        match self {
            IpVersion::V4 => "A",
            IpVersion::V6 => "AAAA",
        }
    }
}

/// Trait for IP source implementations
///
/// A source answers one question per call: what is the current address?
/// It does not poll, cache or retry; the reconciler calls it once per cycle.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error)`: If unable to determine the current IP
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Human readable description (for logs)
    fn describe(&self) -> String {
        "ip source".to_string()
    }
}
