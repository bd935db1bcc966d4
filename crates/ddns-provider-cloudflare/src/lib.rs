// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for the DDNS system.
//
// ## Scope
//
// - ✅ Discovers an A record once (list by zone, name and type)
// - ✅ Updates an A record by its cached record id (one PATCH per change)
// - ✅ Maps HTTP 429 to `Error::RateLimited`, other failures to `Error::RemoteApi`
// - ✅ HTTP timeout taken from the client settings
// - ❌ NO retry logic (left to the caller via `Error::is_retryable`)
// - ❌ NO caching (owned by the record store through `DdnsEngine`)
// - ❌ NO zone auto-discovery (`zone_id` is required)
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to api.cloudflare.com only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Access the record store
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=A`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

mod types;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ddns_core::config::{ClientSettings, Settings};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, RemoteRecord};
use ddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::net::Ipv4Addr;
use std::time::Duration;

pub use types::{CloudflareDnsRecord, CloudflareError, CloudflareResponse, UpdateDnsRecord};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Settings section that enables the provider
pub const SECTION: &str = "cloudflare";

const PROVIDER: &str = "cloudflare";

/// TTL value Cloudflare reads as "automatic"
const AUTO_TTL: u32 = 1;

/// Settings from the `[cloudflare]` section
#[derive(Clone, PartialEq, Eq)]
pub struct CloudflareSettings {
    /// API token with Zone:DNS:Edit permission
    /// ⚠️ NEVER log this value
    pub api_token: String,
    pub zone_id: String,
    /// Record updated when the caller names none
    pub record_name: Option<String>,
    pub ttl: u32,
    pub proxied: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareSettings")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .finish()
    }
}

impl CloudflareSettings {
    /// Read the `[cloudflare]` section
    ///
    /// # Errors
    ///
    /// - `Error::MissingOption` if `api_token` or `zone_id` is absent
    /// - `Error::Configuration` for empty credentials or malformed `ttl`/`proxied`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_token = settings.get(SECTION, "api_token")?;
        let zone_id = settings.get(SECTION, "zone_id")?;

        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.trim().is_empty() {
            return Err(Error::config("Cloudflare zone_id cannot be empty"));
        }

        let record_name = settings
            .get_opt(SECTION, "record_name")?
            .filter(|name| !name.trim().is_empty());

        let ttl = match settings.get_opt(SECTION, "ttl")? {
            Some(raw) => parse_ttl(&raw)?,
            None => AUTO_TTL,
        };

        let proxied = match settings.get_opt(SECTION, "proxied")? {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                Error::config(format!("Invalid Cloudflare proxied flag '{}'", raw))
            })?,
            None => true,
        };

        Ok(Self {
            api_token,
            zone_id,
            record_name,
            ttl,
            proxied,
        })
    }
}

/// Cloudflare accepts 1 (automatic) or 60..=86400 seconds
fn parse_ttl(raw: &str) -> Result<u32> {
    let ttl: u32 = raw
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("Invalid Cloudflare ttl '{}'", raw)))?;

    if ttl == AUTO_TTL || (60..=86_400).contains(&ttl) {
        Ok(ttl)
    } else {
        Err(Error::config(format!(
            "Cloudflare ttl must be 1 (auto) or between 60 and 86400, got {}",
            ttl
        )))
    }
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. The record id it
/// needs for updates is discovered by `lookup_record` and cached by the
/// engine, never by the provider.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    settings: CloudflareSettings,

    /// HTTP client for API requests
    client: reqwest::Client,

    base_url: String,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("settings", &self.settings)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `settings`: Credentials and record defaults
    /// - `timeout`: Timeout applied to every HTTP request
    ///
    /// # Security
    ///
    /// The API token will NEVER be logged or displayed in error messages.
    pub fn new(settings: CloudflareSettings, timeout: Duration) -> Result<Self> {
        if settings.api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            client,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        })
    }

    /// Point the provider at another API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.settings.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    /// Build the PATCH body for an update issued at `now`
    fn update_payload<'a>(
        &self,
        record_name: &'a str,
        new_ip: Ipv4Addr,
        now: DateTime<Utc>,
    ) -> UpdateDnsRecord<'a> {
        UpdateDnsRecord {
            content: new_ip.to_string(),
            name: record_name,
            record_type: "A",
            ttl: self.settings.ttl,
            proxied: self.settings.proxied,
            comment: update_comment(now),
        }
    }

    /// Send an authenticated request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.settings.api_token)
            .send()
            .await
            .map_err(|e| Error::network(format!("Cloudflare {} request failed: {}", action, e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::network(format!("Failed to read Cloudflare {} response: {}", action, e))
        })?;

        if !status.is_success() {
            return Err(Error::from_status(
                PROVIDER,
                status.as_u16(),
                error_body_message(&body),
            ));
        }

        parse_envelope(&body)
    }
}

/// Comment attached to every record this client writes
pub fn update_comment(now: DateTime<Utc>) -> String {
    format!(
        "Updated on {} by ddns.",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Unwrap a successful envelope into its result
fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: CloudflareResponse<T> = serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse Cloudflare response: {}", e);
        Error::remote(PROVIDER, format!("Malformed response: {}", e))
    })?;

    if !envelope.success {
        return Err(Error::remote(PROVIDER, envelope.error_message()));
    }

    envelope
        .result
        .ok_or_else(|| Error::remote(PROVIDER, "Response carried no result"))
}

/// Best-effort message for an error status
///
/// Cloudflare usually sends an envelope even on 4xx; fall back to the raw
/// body otherwise.
fn error_body_message(body: &str) -> String {
    match serde_json::from_str::<CloudflareResponse<serde_json::Value>>(body) {
        Ok(envelope) => envelope.error_message(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

/// Pick the A record named `record_name` out of a list response
fn select_record(
    records: Vec<CloudflareDnsRecord>,
    record_name: &str,
) -> Result<Option<RemoteRecord>> {
    let Some(record) = records
        .into_iter()
        .find(|r| r.record_type == "A" && r.name.eq_ignore_ascii_case(record_name))
    else {
        return Ok(None);
    };

    let ip = parse_content(&record.content)?;
    Ok(Some(RemoteRecord {
        name: record.name,
        ip,
        record_id: Some(record.id),
    }))
}

fn parse_content(content: &str) -> Result<Ipv4Addr> {
    content.trim().parse().map_err(|_| {
        Error::remote(
            PROVIDER,
            format!("Record content '{}' is not an IPv4 address", content),
        )
    })
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Find the A record for `record_name`
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=example.com&type=A
    /// Authorization: Bearer <token>
    /// ```
    async fn lookup_record(&self, record_name: &str) -> Result<Option<RemoteRecord>> {
        tracing::debug!("Looking up Cloudflare A record: {}", record_name);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("name", record_name), ("type", "A")]);

        let records: Vec<CloudflareDnsRecord> = self.send(request, "list").await?;
        tracing::debug!("Cloudflare returned {} record(s) for {}", records.len(), record_name);

        select_record(records, record_name)
    }

    /// Point the record at `new_ip`
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {
    ///   "content": "1.2.3.4",
    ///   "name": "example.com",
    ///   "type": "A",
    ///   "ttl": 1,
    ///   "proxied": true,
    ///   "comment": "Updated on ... by ddns."
    /// }
    /// ```
    async fn update_record(
        &self,
        record_name: &str,
        record_id: Option<&str>,
        new_ip: Ipv4Addr,
    ) -> Result<Ipv4Addr> {
        let record_id = record_id.ok_or_else(|| {
            Error::config(format!(
                "No Cloudflare record id known for {}; it must be discovered first",
                record_name
            ))
        })?;

        let payload = self.update_payload(record_name, new_ip, Utc::now());
        tracing::debug!(
            "PATCH Cloudflare record {} ({}): content={}, ttl={}, proxied={}",
            record_name,
            record_id,
            payload.content,
            payload.ttl,
            payload.proxied
        );

        let request = self.client.patch(self.record_url(record_id)).json(&payload);
        let updated: CloudflareDnsRecord = self.send(request, "update").await?;

        let confirmed = parse_content(&updated.content)?;
        tracing::info!("Cloudflare record {} now points to {}", record_name, confirmed);
        Ok(confirmed)
    }

    fn normalize_name(&self, record_name: &str) -> String {
        record_name
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase()
    }

    fn default_record_name(&self) -> Option<&str> {
        self.settings.record_name.as_deref()
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, settings: &Settings, client: &ClientSettings) -> Result<Box<dyn DnsProvider>> {
        let cloudflare = CloudflareSettings::from_settings(settings)?;
        Ok(Box::new(CloudflareProvider::new(cloudflare, client.http_timeout)?))
    }
}

/// Register the Cloudflare provider with a registry
///
/// This function should be called during initialization to make the
/// Cloudflare provider available.
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider(SECTION, Box::new(CloudflareFactory));
}
