// # HTTP Public IP Source
//
// Discovers the host's public address by asking an IP-echo service.
//
// ## Protocol
//
// One `GET` to the service URL; the body is the caller's address as plain
// text, possibly followed by a newline. No polling and no caching: the
// reconciler asks once per cycle.
//
// ## Services
//
// `https://api.ipify.org` by default. Any service answering with a bare
// address works (`https://ifconfig.me/ip`, `https://icanhazip.com`).

use ddflare_core::traits::{IpSource, IpVersion};
use ddflare_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default IP-echo service
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// Request deadline for the IP-echo service
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Public IP discovery over HTTP
#[derive(Debug, Clone)]
pub struct PublicIpSource {
    /// URL to fetch IP from
    url: String,

    /// Accepted IP version (None = both)
    version: Option<IpVersion>,

    /// HTTP client
    client: reqwest::Client,
}

impl Default for PublicIpSource {
    fn default() -> Self {
        Self::new(DEFAULT_IP_SERVICE)
    }
}

impl PublicIpSource {
    /// Create a source querying `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            version: None,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Only accept addresses of the given version
    pub fn with_version(mut self, version: IpVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Service URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw response body
    ///
    /// The body is returned exactly as received; it is not validated.
    pub async fn fetch_raw(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!(
                "{} answered HTTP {}",
                self.url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::network(format!("failed to read response from {}: {}", self.url, e)))
    }
}

#[async_trait::async_trait]
impl IpSource for PublicIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let body = self.fetch_raw().await?;
        let text = body.trim();

        let ip: IpAddr = text.parse().map_err(|_| {
            Error::invalid_input(format!("{} returned an invalid address: {:?}", self.url, text))
        })?;

        if let Some(version) = self.version {
            if IpVersion::of(&ip) != version {
                return Err(Error::invalid_input(format!(
                    "expected {:?} address from {}, got {}",
                    version, self.url, ip
                )));
            }
        }

        tracing::debug!("Public IP from {}: {}", self.url, ip);
        Ok(ip)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
