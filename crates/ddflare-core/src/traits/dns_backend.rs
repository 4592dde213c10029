// # DNS Backend Trait
//
// Defines the single contract every DDNS provider is driven through.
//
// ## Implementations
//
// - Cloudflare REST zone/record API: `ddflare-provider-cloudflare` crate
// - DynDNS `/nic/update` protocol (Dyn, No-IP, ddns.org): `ddflare-provider-dyndns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddflare_core::DnsBackend;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let mut backend = /* DnsBackend implementation */;
//     backend.init("api-token")?;
//
//     backend.update("host.example.com", "203.0.113.9".parse()?).await?;
//     let live = backend.resolve("host.example.com").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Result of a successful backend write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The provider accepted the new address
    Updated {
        /// The address now set on the record
        new_ip: IpAddr,
    },
    /// The provider reported the record already had this address
    Unchanged {
        /// The address the record holds
        current_ip: IpAddr,
    },
}

impl UpdateResult {
    /// The address the record holds after the call
    pub fn ip(&self) -> IpAddr {
        match self {
            UpdateResult::Updated { new_ip } => *new_ip,
            UpdateResult::Unchanged { current_ip } => *current_ip,
        }
    }
}

/// Trait for DDNS backend implementations
///
/// # Lifecycle
///
/// 1. Construct the backend (endpoint and user agent may be adjusted)
/// 2. Call [`DnsBackend::init`] exactly once with the credential
/// 3. Call [`DnsBackend::resolve`] / [`DnsBackend::update`] any number of times
///
/// `update` before `init` must fail with
/// [`Error::NotAuthorized`](crate::Error::NotAuthorized), never panic.
///
/// # Responsibilities
///
/// Backends perform provider calls and classify the replies. They do not
/// retry, sleep, cache, or decide whether an update is needed: all of that
/// belongs to the [`Reconciler`](crate::engine::Reconciler).
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// One-time authentication setup
    ///
    /// The credential is an opaque API token or a `user:password` pair,
    /// depending on the backend. Calling `init` a second time fails with
    /// [`Error::AlreadyInitialized`](crate::Error::AlreadyInitialized).
    fn init(&mut self, credential: &str) -> Result<(), crate::Error>;

    /// Current address of `fqdn` as seen by the local resolver
    async fn resolve(&self, fqdn: &str) -> Result<IpAddr, crate::Error> {
        crate::resolver::resolve_host(fqdn).await
    }

    /// Point the address record of `fqdn` at `ip`
    ///
    /// This is the only operation with side effects on remote state.
    async fn update(&self, fqdn: &str, ip: IpAddr) -> Result<UpdateResult, crate::Error>;

    /// Create a record for `fqdn`
    async fn add(&self, fqdn: &str) -> Result<(), crate::Error> {
        Err(crate::Error::unsupported(format!(
            "{}: cannot add record {}",
            self.backend_name(),
            fqdn
        )))
    }

    /// Delete the record of `fqdn`
    async fn delete(&self, fqdn: &str) -> Result<(), crate::Error> {
        Err(crate::Error::unsupported(format!(
            "{}: cannot delete record {}",
            self.backend_name(),
            fqdn
        )))
    }

    /// Provider base URL
    fn endpoint(&self) -> &str;

    /// Change the provider base URL
    fn set_endpoint(&mut self, endpoint: &str);

    /// User agent sent to the provider
    fn user_agent(&self) -> &str;

    /// Change the user agent sent to the provider
    fn set_user_agent(&mut self, user_agent: &str);

    /// Backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing backends from configuration
pub trait BackendFactory: Send + Sync {
    /// Create an uninitialized backend instance from configuration
    ///
    /// The returned backend still needs [`DnsBackend::init`].
    fn create(
        &self,
        config: &crate::config::BackendConfig,
    ) -> Result<Box<dyn DnsBackend>, crate::Error>;
}
