// # DynDNS Update Protocol Backend
//
// Drives the legacy `/nic/update` protocol spoken by Dyn, No-IP, ddns.org
// and many self-hosted services.
//
// ## Protocol
//
// ```http
// GET {endpoint}/nic/update?hostname={fqdn}&myip={ip}
// Authorization: Basic base64(user:password)
// User-Agent: ddflare/{version}
// ```
//
// The plain-text reply is classified by [`interpret_status`]. Only `good`
// and `nochg` count as success.
//
// ## Security
//
// The encoded credential NEVER appears in logs or Debug output.

pub mod status;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use ddflare_core::config::{BackendConfig, DYN_ENDPOINT};
use ddflare_core::traits::{BackendFactory, DnsBackend, UpdateResult};
use ddflare_core::{BackendRegistry, DEFAULT_USER_AGENT, Error, Result};
use std::net::IpAddr;
use std::time::Duration;

pub use status::{DynStatus, StatusReply, interpret_status};

/// Default HTTP timeout for update requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// DynDNS protocol backend
pub struct DynDnsBackend {
    endpoint: String,
    user_agent: String,

    /// Base64 `user:password`, present once initialized
    /// ⚠️ NEVER log this value
    auth: Option<String>,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the credential
impl std::fmt::Debug for DynDnsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynDnsBackend")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("auth", &self.auth.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl Default for DynDnsBackend {
    fn default() -> Self {
        Self::new(DYN_ENDPOINT)
    }
}

impl DynDnsBackend {
    /// Create an uninitialized backend talking to `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth: None,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Ask the provider to use the request's source address
    ///
    /// Sends the update without `myip`. The reply argument, when present,
    /// is the address the provider recorded.
    pub async fn update_from_source(&self, fqdn: &str) -> Result<StatusReply> {
        self.send(fqdn, None).await
    }

    async fn send(&self, fqdn: &str, ip: Option<IpAddr>) -> Result<StatusReply> {
        let auth = match self.auth.as_deref() {
            Some(auth) if !auth.is_empty() => auth,
            _ => return Err(Error::not_authorized("no authorization credentials found")),
        };
        if fqdn.is_empty() {
            return Err(Error::invalid_name(fqdn, "FQDN is missing"));
        }

        let url = format!("{}/nic/update", self.endpoint);
        let mut query = vec![("hostname", fqdn.to_string())];
        if let Some(ip) = ip {
            query.push(("myip", ip.to_string()));
        }

        tracing::debug!("Sending update for {} to {}", fqdn, self.endpoint);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", auth))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::communication(&self.endpoint, format!("connection failed: {}", e)))?;

        let status = response.status();
        tracing::debug!("Endpoint {} answered {}", self.endpoint, status);

        if !status.is_success() {
            return Err(Error::communication(
                &self.endpoint,
                format!("endpoint returned HTTP {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::communication(&self.endpoint, format!("failure reading reply: {}", e)))?;

        if body.trim().is_empty() {
            return Err(Error::communication(&self.endpoint, "empty reply"));
        }

        tracing::debug!("Parsing reply message: {:?}", body.trim());
        interpret_status(&body).into_result()
    }
}

#[async_trait]
impl DnsBackend for DynDnsBackend {
    fn init(&mut self, credential: &str) -> Result<()> {
        if self.auth.is_some() {
            return Err(Error::already_initialized("dyndns"));
        }
        self.auth = Some(general_purpose::STANDARD.encode(credential.as_bytes()));
        Ok(())
    }

    async fn update(&self, fqdn: &str, ip: IpAddr) -> Result<UpdateResult> {
        let reply = self.send(fqdn, Some(ip)).await?;

        let confirmed = match reply.argument.as_deref().map(str::parse::<IpAddr>) {
            Some(Ok(confirmed)) => confirmed,
            Some(Err(_)) => {
                tracing::warn!(
                    "Reply argument {:?} is not an address, assuming {}",
                    reply.argument,
                    ip
                );
                ip
            }
            None => ip,
        };

        match reply.status {
            DynStatus::NoChange => Ok(UpdateResult::Unchanged {
                current_ip: confirmed,
            }),
            _ => {
                tracing::debug!("Update successful: {} -> {}", fqdn, confirmed);
                Ok(UpdateResult::Updated { new_ip: confirmed })
            }
        }
    }

    async fn add(&self, _fqdn: &str) -> Result<()> {
        Err(Error::unsupported("not supported"))
    }

    async fn delete(&self, _fqdn: &str) -> Result<()> {
        Err(Error::unsupported("not supported"))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn set_endpoint(&mut self, endpoint: &str) {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    fn backend_name(&self) -> &'static str {
        "dyndns"
    }
}

/// Factory for creating DynDNS backends
pub struct DynDnsFactory;

impl BackendFactory for DynDnsFactory {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn DnsBackend>> {
        match config {
            BackendConfig::DynDns { endpoint, .. } => {
                if endpoint.is_empty() {
                    return Err(Error::config("DynDNS endpoint is required"));
                }
                Ok(Box::new(DynDnsBackend::new(endpoint.as_str())))
            }
            _ => Err(Error::config("Invalid config for DynDNS backend")),
        }
    }
}

/// Register the DynDNS backend with a registry
///
/// # Example
///
/// ```rust
/// use ddflare_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// ddflare_provider_dyndns::register(&registry);
/// assert!(registry.has_backend("dyndns"));
/// ```
pub fn register(registry: &BackendRegistry) {
    registry.register_backend("dyndns", Box::new(DynDnsFactory));
}
