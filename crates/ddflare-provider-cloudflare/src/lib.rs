// # Cloudflare DNS Backend
//
// Drives the Cloudflare v4 zone/record API through the ddflare backend
// contract.
//
// ## Update Flow
//
// 1. Require a prior `init` (the API token)
// 2. Derive the zone from the FQDN (last two labels, no DNS lookup)
// 3. Zone name → zone ID (skipped when a zone ID is configured)
// 4. List A/AAAA records named after the FQDN (type follows the IP family)
// 5. Exactly one match required; the write is never attempted otherwise
// 6. PUT the record back with only `content` replaced
//
// Any provider failure short-circuits. There are no retries: the
// reconciler owns that decision.
//
// ## Security
//
// - API token NEVER appears in logs
// - Debug output redacts the token

pub mod api;

use api::{CloudflareApi, HttpCloudflareApi};
use async_trait::async_trait;
use ddflare_core::config::BackendConfig;
use ddflare_core::traits::{BackendFactory, DnsBackend, IpVersion, UpdateResult};
use ddflare_core::{BackendRegistry, DEFAULT_USER_AGENT, Error, Result, derive_zone};
use std::net::IpAddr;

pub use api::{DnsRecord, RecordUpdate, Zone};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare DNS backend
///
/// # Lifecycle
///
/// Constructed without credentials; [`DnsBackend::init`] builds the API
/// client from the token and the endpoint/user agent set at that moment.
/// Later endpoint or user agent changes do not affect an initialized client.
pub struct CloudflareBackend {
    endpoint: String,
    user_agent: String,

    /// Zone ID (optional, looked up from the FQDN otherwise)
    zone_id: Option<String>,

    /// API client, present once initialized
    api: Option<Box<dyn CloudflareApi>>,
}

// Custom Debug implementation: the token lives inside `api`
impl std::fmt::Debug for CloudflareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareBackend")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("zone_id", &self.zone_id)
            .field("initialized", &self.api.is_some())
            .finish()
    }
}

impl Default for CloudflareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudflareBackend {
    /// Create an uninitialized backend for the public Cloudflare API
    pub fn new() -> Self {
        Self {
            endpoint: CLOUDFLARE_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            zone_id: None,
            api: None,
        }
    }

    /// Use a fixed zone ID instead of looking it up by name
    pub fn with_zone_id(mut self, zone_id: Option<String>) -> Self {
        self.zone_id = zone_id;
        self
    }

    /// Use a ready-made API client
    ///
    /// The backend counts as initialized afterwards.
    pub fn with_api(mut self, api: Box<dyn CloudflareApi>) -> Self {
        self.api = Some(api);
        self
    }

    async fn lookup_zone_id(&self, api: &dyn CloudflareApi, zone: &str) -> Result<String> {
        if let Some(zone_id) = &self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let zones = api
            .list_zones(zone)
            .await
            .map_err(|e| Error::zone_not_found(zone, e.to_string()))?;

        let found = zones
            .iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone))
            .ok_or_else(|| Error::zone_not_found(zone, "no zone with this name is visible to the token"))?;

        tracing::debug!("Found zone ID {} for {}", found.id, zone);
        Ok(found.id.clone())
    }
}

#[async_trait]
impl DnsBackend for CloudflareBackend {
    fn init(&mut self, credential: &str) -> Result<()> {
        if self.api.is_some() {
            return Err(Error::already_initialized("cloudflare"));
        }
        if credential.is_empty() {
            return Err(Error::not_authorized("empty Cloudflare API token"));
        }

        let api = HttpCloudflareApi::new(&self.endpoint, credential, &self.user_agent)?;
        self.api = Some(Box::new(api));
        Ok(())
    }

    async fn update(&self, fqdn: &str, ip: IpAddr) -> Result<UpdateResult> {
        let api = self
            .api
            .as_deref()
            .ok_or_else(|| Error::not_authorized("cloudflare backend not initialized"))?;

        let zone = derive_zone(fqdn)?;
        let name = fqdn.strip_suffix('.').unwrap_or(fqdn);
        let record_type = IpVersion::of(&ip).record_type();

        tracing::debug!("Updating {} record {} in zone {}", record_type, name, zone);

        let zone_id = self.lookup_zone_id(api, &zone).await?;

        let records = api.list_records(&zone_id, name, record_type).await?;
        for (i, record) in records.iter().enumerate() {
            tracing::debug!("Record {} found: id={} content={}", i, record.id, record.content);
        }

        let record = match records.as_slice() {
            [record] => record,
            [] => return Err(Error::record_not_found(name)),
            many => return Err(Error::ambiguous_record(name, many.len())),
        };

        let previous: Option<IpAddr> = record.content.parse().ok();
        let payload = record.update_payload(ip.to_string());
        let updated = api.update_record(&zone_id, &record.id, &payload).await?;

        tracing::debug!("Record {} now holds {}", updated.id, updated.content);

        if previous == Some(ip) {
            return Ok(UpdateResult::Unchanged { current_ip: ip });
        }
        Ok(UpdateResult::Updated { new_ip: ip })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn set_endpoint(&mut self, endpoint: &str) {
        if self.api.is_some() {
            tracing::warn!("Cloudflare backend already initialized, endpoint change applies to new clients only");
        }
        self.endpoint = endpoint.trim_end_matches('/').to_string();
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    fn backend_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare backends
pub struct CloudflareFactory;

impl BackendFactory for CloudflareFactory {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn DnsBackend>> {
        match config {
            BackendConfig::Cloudflare {
                api_token,
                zone_id,
                endpoint,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                let mut backend = CloudflareBackend::new().with_zone_id(zone_id.clone());
                if let Some(endpoint) = endpoint {
                    backend.set_endpoint(endpoint);
                }
                Ok(Box::new(backend))
            }
            _ => Err(Error::config("Invalid config for Cloudflare backend")),
        }
    }
}

/// Register the Cloudflare backend with a registry
///
/// # Example
///
/// ```rust
/// use ddflare_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// ddflare_provider_cloudflare::register(&registry);
/// assert!(registry.has_backend("cloudflare"));
/// ```
pub fn register(registry: &BackendRegistry) {
    registry.register_backend("cloudflare", Box::new(CloudflareFactory));
}
