//! Configuration types for ddflare
//!
//! This module defines all configuration structures used throughout the
//! workspace. The daemon builds a [`DdflareConfig`] from its flags and
//! environment; library users can deserialize one from JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Dyn update endpoint
pub const DYN_ENDPOINT: &str = "https://members.dyndns.org";

/// No-IP update endpoint
pub const NOIP_ENDPOINT: &str = "https://dynupdate.no-ip.com";

/// ddns.org update endpoint
pub const DDNS_ENDPOINT: &str = "https://update.ddns.org";

/// Interval used by the `loop` shorthand (5 minutes)
pub const DEFAULT_LOOP_INTERVAL_SECS: u64 = 300;

/// Main ddflare configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdflareConfig {
    /// FQDN whose address record is managed
    pub fqdn: String,

    /// Explicit address; `None` means discover the public IP each cycle
    #[serde(default)]
    pub address: Option<IpAddr>,

    /// Check cached/live state before writing
    #[serde(default)]
    pub check: bool,

    /// Seconds between cycles; 0 runs a single cycle
    #[serde(default)]
    pub interval_secs: u64,

    /// Backend configuration
    pub backend: BackendConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdflareConfig {
    /// Create a configuration with defaults for the given FQDN and backend
    pub fn new(fqdn: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            fqdn: fqdn.into(),
            address: None,
            check: false,
            interval_secs: 0,
            backend,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_fqdn(&self.fqdn)?;
        self.backend.validate()?;
        self.engine.validate()?;
        Ok(())
    }

    /// Settings for the reconciliation loop
    ///
    /// A non-zero interval implies check mode.
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            fqdn: self.fqdn.clone(),
            address: self.address,
            check: self.check || self.interval_secs > 0,
            interval: Duration::from_secs(self.interval_secs),
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Cloudflare REST zone/record API
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, looked up from the FQDN otherwise)
        #[serde(default)]
        zone_id: Option<String>,
        /// API base URL override
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// DynDNS `/nic/update` protocol
    #[serde(rename = "dyndns")]
    DynDns {
        /// Update service base URL
        endpoint: String,
        /// Account user name
        username: String,
        /// Account password (or update key)
        password: String,
    },
}

impl BackendConfig {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            BackendConfig::Cloudflare {
                api_token,
                endpoint,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token cannot be empty"));
                }
                if let Some(endpoint) = endpoint {
                    validate_endpoint(endpoint)?;
                }
                Ok(())
            }
            BackendConfig::DynDns {
                endpoint,
                username,
                password,
            } => {
                validate_endpoint(endpoint)?;
                if username.is_empty() || password.is_empty() {
                    return Err(Error::config(
                        "DynDNS backend requires both a username and a password",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::Cloudflare { .. } => "cloudflare",
            BackendConfig::DynDns { .. } => "dyndns",
        }
    }

    /// Credential to pass to `DnsBackend::init`
    ///
    /// The API token for Cloudflare, `user:password` for DynDNS.
    pub fn credential(&self) -> String {
        match self {
            BackendConfig::Cloudflare { api_token, .. } => api_token.clone(),
            BackendConfig::DynDns {
                username, password, ..
            } => format!("{}:{}", username, password),
        }
    }

    /// Configured endpoint, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            BackendConfig::Cloudflare { endpoint, .. } => endpoint.as_deref(),
            BackendConfig::DynDns { endpoint, .. } => Some(endpoint),
        }
    }
}

/// A service selector resolved to a backend kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Service {
    /// Cloudflare REST API
    Cloudflare,
    /// DynDNS protocol at the given base URL
    DynDns(String),
}

/// Resolve a service selector
///
/// `cflare`/`cloudflare` select the REST backend; `dyn`, `noip` and `ddns`
/// map to their well-known update endpoints; anything else is taken as a
/// DynDNS-protocol base URL.
pub fn resolve_service(svc: &str) -> Result<Service> {
    match svc {
        "cflare" | "cloudflare" => Ok(Service::Cloudflare),
        "dyn" => Ok(Service::DynDns(DYN_ENDPOINT.to_string())),
        "noip" => Ok(Service::DynDns(NOIP_ENDPOINT.to_string())),
        "ddns" => Ok(Service::DynDns(DDNS_ENDPOINT.to_string())),
        url => {
            validate_endpoint(url)?;
            Ok(Service::DynDns(url.trim_end_matches('/').to_string()))
        }
    }
}

/// Settings consumed by the [`Reconciler`](crate::engine::Reconciler)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// FQDN whose address record is managed
    pub fqdn: String,
    /// Explicit address (wins over discovery)
    pub address: Option<IpAddr>,
    /// Check cached/live state before writing
    pub check: bool,
    /// Time between cycles; zero runs exactly one cycle
    pub interval: Duration,
}

impl ReconcileConfig {
    /// Single-shot configuration without check mode
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            address: None,
            check: false,
            interval: Duration::ZERO,
        }
    }

    /// Set the explicit address
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Enable or disable check mode
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Set the polling interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    64
}

/// Validate that a string is a usable FQDN
///
/// Basic RFC 1035 checks: total length, label length, label characters,
/// no leading/trailing hyphen, and at least two labels so a zone can be
/// derived.
pub fn validate_fqdn(fqdn: &str) -> Result<()> {
    if fqdn.is_empty() {
        return Err(Error::invalid_name(fqdn, "domain name cannot be empty"));
    }

    let name = fqdn.strip_suffix('.').unwrap_or(fqdn);

    if name.len() > 253 {
        return Err(Error::invalid_name(
            fqdn,
            format!("too long: {} chars (max 253)", name.len()),
        ));
    }

    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err(Error::invalid_name(fqdn, "at least two labels are required"));
    }

    for label in labels {
        if label.is_empty() {
            return Err(Error::invalid_name(fqdn, "empty label"));
        }
        if label.len() > 63 {
            return Err(Error::invalid_name(
                fqdn,
                format!("label {:?} too long: {} chars (max 63)", label, label.len()),
            ));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_name(
                fqdn,
                format!("label {:?} contains invalid characters", label),
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_name(
                fqdn,
                format!("label {:?} cannot start or end with hyphen", label),
            ));
        }
    }

    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(Error::config("endpoint cannot be empty"));
    }
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        return Err(Error::config(format!(
            "endpoint must use HTTP or HTTPS scheme, got: {}",
            endpoint
        )));
    }
    if endpoint.starts_with("http://") {
        tracing::warn!("Endpoint {} uses plain HTTP, credentials travel unencrypted", endpoint);
    }
    Ok(())
}
