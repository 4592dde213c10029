//! Core traits for ddflare
//!
//! - [`DnsBackend`]: Drive a DDNS provider through one contract
//! - [`IpSource`]: Discover the address the record should point at

pub mod dns_backend;
pub mod ip_source;

pub use dns_backend::{BackendFactory, DnsBackend, UpdateResult};
pub use ip_source::{IpSource, IpVersion};
