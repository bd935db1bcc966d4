// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for the DDNS system.
//
// ## Purpose
//
// Discovers the host's public IPv4 address by asking external IP-echo
// services. Services are tried in order; the first valid answer wins.
//
// ## Supported Response Formats
//
// - Plain text: the body is the address (`https://api.ipify.org`)
// - Trace format: one `key=value` per line with an `ip=` line
//   (`https://cloudflare.com/cdn-cgi/trace`)
//
// ## Architecture
//
// One-shot: every `current()` call issues fresh requests. There is no
// polling loop and no cache.

use ddns_core::config::ClientSettings;
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// HTTP-based IP source with ordered fallback
pub struct HttpIpSource {
    /// URLs to fetch the IP from, in order
    services: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpIpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIpSource")
            .field("services", &self.services)
            .finish()
    }
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `services`: URLs to query, in fallback order (e.g., "https://api.ipify.org")
    /// - `timeout`: Timeout applied to each request
    pub fn new(services: Vec<String>, timeout: Duration) -> Result<Self> {
        if services.is_empty() {
            return Err(Error::config("At least one IP service URL is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { services, client })
    }

    /// Create from the `[client]` settings (`ip_services`, `http_timeout_secs`)
    pub fn from_client_settings(client: &ClientSettings) -> Result<Self> {
        Self::new(client.ip_services.clone(), client.http_timeout)
    }

    /// Configured services, in fallback order
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Fetch current IP from one HTTP service
    async fn fetch_ip(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!("{} answered with status {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response from {}: {}", url, e)))?;

        parse_ip_body(&body)
    }
}

/// Extract an IPv4 address from an IP-echo response body
///
/// Accepts a bare address or a trace body containing an `ip=` line.
///
/// # Errors
///
/// `Error::InvalidInput` when the body holds no address or an IPv6 one.
pub fn parse_ip_body(body: &str) -> Result<Ipv4Addr> {
    let candidate = body
        .lines()
        .find_map(|line| line.trim().strip_prefix("ip="))
        .unwrap_or(body)
        .trim();

    match candidate.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::invalid_input(format!(
            "Expected IPv4, got: {}",
            ip
        ))),
        Err(_) => {
            let shown: String = candidate.chars().take(64).collect();
            Err(Error::invalid_input(format!("Invalid IP address: '{}'", shown)))
        }
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        let mut last_error = None;

        for url in &self.services {
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    tracing::debug!("{} reported {}", url, ip);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!("IP service {} failed: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::config("No IP services configured")))
    }

    fn source_name(&self) -> &str {
        "http"
    }
}
