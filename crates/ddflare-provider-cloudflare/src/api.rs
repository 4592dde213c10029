// # Cloudflare API v4 Client
//
// The three remote calls the backend needs, behind [`CloudflareApi`] so the
// record-selection logic can be exercised without a network.
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
//
// Every response is wrapped in an envelope:
//
// ```json
// { "success": true, "errors": [], "messages": [], "result": ... }
// ```
//
// ## Security
//
// The API token is sent as a bearer token and never logged.

use async_trait::async_trait;
use ddflare_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A zone as returned by `GET /zones`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// A DNS record as returned by `GET /zones/:id/dns_records`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    /// TTL in seconds, 1 means automatic
    #[serde(default = "auto_ttl")]
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

fn auto_ttl() -> u32 {
    1
}

impl DnsRecord {
    /// Payload that rewrites this record with new content
    ///
    /// Every other attribute is carried over so the PUT does not reset it.
    pub fn update_payload(&self, content: impl Into<String>) -> RecordUpdate {
        RecordUpdate {
            record_type: self.record_type.clone(),
            name: self.name.clone(),
            content: content.into(),
            ttl: self.ttl,
            proxied: self.proxied,
            comment: self.comment.clone(),
            tags: self.tags.clone(),
            data: self.data.clone(),
        }
    }
}

/// Body of `PUT /zones/:zone_id/dns_records/:record_id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordUpdate {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

/// Remote operations used by [`CloudflareBackend`](crate::CloudflareBackend)
#[async_trait]
pub trait CloudflareApi: Send + Sync {
    /// Zones visible to the token whose name is `name`
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>>;

    /// Records of `record_type` named `name` in the zone
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<DnsRecord>>;

    /// Overwrite a record
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<DnsRecord>;
}

/// [`CloudflareApi`] over HTTPS with a bearer token
pub struct HttpCloudflareApi {
    endpoint: String,
    /// ⚠️ NEVER log this value
    api_token: String,
    user_agent: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for HttpCloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCloudflareApi")
            .field("endpoint", &self.endpoint)
            .field("api_token", &"<REDACTED>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl HttpCloudflareApi {
    /// Create a client for `endpoint` (e.g. `https://api.cloudflare.com/client/v4`)
    pub fn new(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            user_agent: user_agent.into(),
            client,
        })
    }

    /// Send a request and unwrap the response envelope
    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("{}: HTTP request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("{}: failed to read response: {}", what, e)))?;

        if !status.is_success() {
            return Err(Error::provider(
                PROVIDER,
                describe_failure(status.as_u16(), what, &body),
            ));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| Error::provider(PROVIDER, format!("{}: failed to parse response: {}", what, e)))?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{} failed: {}", what, join_messages(&envelope.errors)),
            ));
        }

        envelope
            .result
            .ok_or_else(|| Error::provider(PROVIDER, format!("{}: response carries no result", what)))
    }
}

#[async_trait]
impl CloudflareApi for HttpCloudflareApi {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        tracing::debug!("Looking up zone ID for {}", name);

        let url = format!("{}/zones", self.endpoint);
        let request = self.client.get(&url).query(&[("name", name)]);
        self.call(request, "zone lookup").await
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Looking up {} records for {}", record_type, name);

        let url = format!("{}/zones/{}/dns_records", self.endpoint, zone_id);
        let request = self
            .client
            .get(&url)
            .query(&[("name", name), ("type", record_type)]);
        self.call(request, "record lookup").await
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<DnsRecord> {
        let url = format!("{}/zones/{}/dns_records/{}", self.endpoint, zone_id, record_id);
        let request = self.client.put(&url).json(update);
        self.call(request, "record update").await
    }
}

/// Map a non-2xx reply to a readable message
fn describe_failure(status: u16, what: &str, body: &str) -> String {
    let detail = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => join_messages(&envelope.errors),
        _ => body.chars().take(200).collect(),
    };

    match status {
        401 | 403 => format!(
            "{}: authentication failed, invalid API token or insufficient permissions (HTTP {}): {}",
            what, status, detail
        ),
        404 => format!("{}: not found (HTTP 404): {}", what, detail),
        409 => format!("{}: conflicting update in progress (HTTP 409): {}", what, detail),
        429 => format!("{}: rate limit exceeded (HTTP 429)", what),
        500..=599 => format!("{}: Cloudflare server error (HTTP {}): {}", what, status, detail),
        _ => format!("{} failed (HTTP {}): {}", what, status, detail),
    }
}

fn join_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "unknown error".to_string();
    }
    messages
        .iter()
        .map(|m| format!("[{}] {}", m.code, m.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_payload_preserves_attributes() {
        let record: DnsRecord = serde_json::from_value(serde_json::json!({
            "id": "rec1",
            "name": "host.example.com",
            "type": "A",
            "content": "203.0.113.1",
            "ttl": 120,
            "proxied": true,
            "comment": "home router",
            "tags": ["owner:ops"],
            "zone_id": "ignored"
        }))
        .unwrap();

        let payload = record.update_payload("203.0.113.9");
        let body = serde_json::to_value(&payload).unwrap();

        assert_eq!(body["type"], "A");
        assert_eq!(body["name"], "host.example.com");
        assert_eq!(body["content"], "203.0.113.9");
        assert_eq!(body["ttl"], 120);
        assert_eq!(body["proxied"], true);
        assert_eq!(body["comment"], "home router");
        assert_eq!(body["tags"], serde_json::json!(["owner:ops"]));
        assert!(body.get("data").is_none());
    }

    #[test]
    fn missing_ttl_means_automatic() {
        let record: DnsRecord = serde_json::from_value(serde_json::json!({
            "id": "rec1", "name": "host.example.com", "type": "AAAA", "content": "2001:db8::1"
        }))
        .unwrap();
        assert_eq!(record.ttl, 1);
    }

    #[test]
    fn failure_messages() {
        let body = r#"{"success":false,"errors":[{"code":9109,"message":"Invalid access token"}]}"#;
        let msg = describe_failure(403, "zone lookup", body);
        assert!(msg.contains("authentication failed"));
        assert!(msg.contains("[9109] Invalid access token"));

        assert!(describe_failure(429, "record update", "").contains("rate limit"));
        assert!(describe_failure(502, "record lookup", "bad gateway").contains("bad gateway"));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let api = HttpCloudflareApi::new(
            "https://api.cloudflare.com/client/v4",
            "secret_token_12345",
            "ddflare-test",
        )
        .unwrap();

        let debug_str = format!("{:?}", api);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("<REDACTED>"));
    }
}
