// # DuckDNS Provider
//
// This crate provides a DuckDNS provider implementation for the DDNS system.
//
// DuckDNS has no record API: a record is discovered by resolving
// `<name>.duckdns.org`, and updated through a single GET endpoint.
//
// ## Scope
//
// - ✅ Discovers the current address with one DNS resolution
// - ✅ Updates with one GET to the update endpoint (verbose mode)
// - ✅ Accepts `myhost` and `myhost.duckdns.org` as the same record
// - ❌ NO retry logic (left to the caller)
// - ❌ NO caching (owned by the record store through `DdnsEngine`)
//
// ## Security Requirements
//
// - The token NEVER appears in logs or `Debug` output
//
// ## API Reference
//
// - https://www.duckdns.org/spec.jsp
// - Update: GET `/update?domains=<name>.duckdns.org&token=...&ip=...&verbose=true`
//
// Verbose responses are four lines:
//
// ```text
// OK
// 1.2.3.4
//
// UPDATED
// ```

use async_trait::async_trait;
use ddns_core::config::{ClientSettings, Settings};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, RemoteRecord};
use ddns_core::{Error, Result};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// DuckDNS update endpoint
const DUCKDNS_UPDATE_URL: &str = "https://www.duckdns.org/update";

/// Zone every DuckDNS record lives under
const DUCKDNS_SUFFIX: &str = ".duckdns.org";

/// Settings section that enables the provider
pub const SECTION: &str = "duckdns";

const PROVIDER: &str = "duckdns";

/// Strip the `.duckdns.org` suffix, if present
///
/// ```rust
/// use ddns_provider_duckdns::parse_domain_name;
///
/// assert_eq!(parse_domain_name("foo.duckdns.org"), "foo");
/// assert_eq!(parse_domain_name("foo"), "foo");
/// ```
pub fn parse_domain_name(record_name: &str) -> &str {
    record_name
        .strip_suffix(DUCKDNS_SUFFIX)
        .unwrap_or(record_name)
}

/// Fully qualified host for a normalized record name
fn qualified_name(record_name: &str) -> String {
    format!("{}{}", parse_domain_name(record_name), DUCKDNS_SUFFIX)
}

/// Parsed verbose response of the update endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
    /// Address DuckDNS now holds, if it echoed one
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<String>,
    /// Whether DuckDNS changed the record (`UPDATED`) or not (`NOCHANGE`)
    pub changed: bool,
}

/// Parse the verbose response of the update endpoint
///
/// # Errors
///
/// `Error::RemoteApi` when the status is not `OK` or the body is malformed.
pub fn parse_api_response(body: &str) -> Result<UpdateResponse> {
    let lines: Vec<&str> = body.lines().map(str::trim).collect();

    let status = lines.first().copied().unwrap_or_default();
    if status != "OK" {
        let status = if status.is_empty() { "<empty>" } else { status };
        return Err(Error::remote(
            PROVIDER,
            format!("Update rejected with status {}", status),
        ));
    }

    if lines.len() < 4 {
        return Err(Error::remote(
            PROVIDER,
            format!("Malformed response: expected 4 lines, got {}", lines.len()),
        ));
    }

    let ipv4 = match lines[1] {
        "" => None,
        raw => Some(raw.parse::<Ipv4Addr>().map_err(|_| {
            Error::remote(PROVIDER, format!("Malformed response: invalid IPv4 '{}'", raw))
        })?),
    };

    let ipv6 = Some(lines[2]).filter(|v| !v.is_empty()).map(str::to_string);

    let changed = match lines[3] {
        "UPDATED" => true,
        "NOCHANGE" => false,
        other => {
            return Err(Error::remote(
                PROVIDER,
                format!("Malformed response: unknown update status '{}'", other),
            ));
        }
    };

    Ok(UpdateResponse {
        ipv4,
        ipv6,
        changed,
    })
}

/// Settings from the `[duckdns]` section
#[derive(Clone, PartialEq, Eq)]
pub struct DuckDnsSettings {
    /// Account token
    /// ⚠️ NEVER log this value
    pub token: String,
    /// Record updated when the caller names none
    pub domains: Option<String>,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for DuckDnsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsSettings")
            .field("token", &"<REDACTED>")
            .field("domains", &self.domains)
            .finish()
    }
}

impl DuckDnsSettings {
    /// Read the `[duckdns]` section
    ///
    /// # Errors
    ///
    /// - `Error::MissingOption` if `token` is absent
    /// - `Error::Configuration` if it is empty
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let token = settings.get(SECTION, "token")?;
        if token.trim().is_empty() {
            return Err(Error::config("DuckDNS token cannot be empty"));
        }

        let domains = settings
            .get_opt(SECTION, "domains")?
            .filter(|d| !d.trim().is_empty());

        Ok(Self { token, domains })
    }
}

/// DuckDNS provider
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. DuckDNS has no record ids, so every
/// `RemoteRecord` it returns carries `record_id: None`.
pub struct DuckDnsProvider {
    settings: DuckDnsSettings,

    /// HTTP client for the update endpoint
    client: reqwest::Client,

    /// Upper bound on the discovery lookup
    timeout: Duration,

    update_url: String,
}

impl std::fmt::Debug for DuckDnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsProvider")
            .field("settings", &self.settings)
            .field("update_url", &self.update_url)
            .finish()
    }
}

impl DuckDnsProvider {
    /// Create a new DuckDNS provider
    ///
    /// # Parameters
    ///
    /// - `settings`: Token and default domain
    /// - `timeout`: Timeout applied to the DNS lookup and the update request
    pub fn new(settings: DuckDnsSettings, timeout: Duration) -> Result<Self> {
        if settings.token.trim().is_empty() {
            return Err(Error::config("DuckDNS token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            client,
            timeout,
            update_url: DUCKDNS_UPDATE_URL.to_string(),
        })
    }

    /// Point the provider at another update endpoint
    pub fn with_update_url(mut self, update_url: impl Into<String>) -> Self {
        self.update_url = update_url.into();
        self
    }

    /// Query parameters for an update request
    fn update_query(&self, record_name: &str, new_ip: Ipv4Addr) -> [(&'static str, String); 4] {
        [
            ("domains", qualified_name(record_name)),
            ("token", self.settings.token.clone()),
            ("ip", new_ip.to_string()),
            ("verbose", "true".to_string()),
        ]
    }
}

/// First IPv4 address among resolver answers
fn first_ipv4(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<Ipv4Addr> {
    addrs.into_iter().find_map(|addr| match addr {
        SocketAddr::V4(v4) => Some(*v4.ip()),
        SocketAddr::V6(_) => None,
    })
}

/// Await a resolver query, bounded by `timeout`
///
/// A resolver failure or an elapsed timeout is `Error::Network`.
async fn resolve_ipv4<F, I>(host: &str, timeout: Duration, lookup: F) -> Result<Option<Ipv4Addr>>
where
    F: Future<Output = std::io::Result<I>>,
    I: IntoIterator<Item = SocketAddr>,
{
    let addrs = tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| {
            Error::network(format!("DNS lookup for {} timed out after {:?}", host, timeout))
        })?
        .map_err(|e| Error::network(format!("DNS lookup for {} failed: {}", host, e)))?;

    Ok(first_ipv4(addrs))
}

#[async_trait]
impl DnsProvider for DuckDnsProvider {
    /// Resolve `<name>.duckdns.org`
    ///
    /// Returns `None` when the name resolves to no IPv4 address.
    async fn lookup_record(&self, record_name: &str) -> Result<Option<RemoteRecord>> {
        let host = qualified_name(record_name);
        tracing::debug!("Performing DNS lookup for {}", host);

        let lookup = tokio::net::lookup_host((host.as_str(), 0));
        let Some(ip) = resolve_ipv4(&host, self.timeout, lookup).await? else {
            tracing::debug!("{} has no IPv4 address", host);
            return Ok(None);
        };

        tracing::debug!("{} resolves to {}", host, ip);
        Ok(Some(RemoteRecord {
            name: parse_domain_name(record_name).to_string(),
            ip,
            record_id: None,
        }))
    }

    /// Send the new address to the update endpoint
    ///
    /// `record_id` is ignored; DuckDNS identifies records by name.
    async fn update_record(
        &self,
        record_name: &str,
        _record_id: Option<&str>,
        new_ip: Ipv4Addr,
    ) -> Result<Ipv4Addr> {
        tracing::debug!(
            "Calling DuckDNS update for {} with ip={}",
            qualified_name(record_name),
            new_ip
        );

        let response = self
            .client
            .get(&self.update_url)
            .query(&self.update_query(record_name, new_ip))
            .send()
            .await
            .map_err(|e| Error::network(format!("DuckDNS update request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read DuckDNS response: {}", e.without_url())))?;

        if !status.is_success() {
            return Err(Error::from_status(PROVIDER, status.as_u16(), body.trim()));
        }

        let parsed = parse_api_response(&body)?;
        tracing::debug!(
            "DuckDNS answered ipv4={:?}, ipv6={:?}, changed={}",
            parsed.ipv4,
            parsed.ipv6,
            parsed.changed
        );

        let confirmed = parsed.ipv4.unwrap_or(new_ip);
        tracing::info!("DuckDNS record {} now points to {}", record_name, confirmed);
        Ok(confirmed)
    }

    fn normalize_name(&self, record_name: &str) -> String {
        parse_domain_name(record_name.trim()).to_string()
    }

    fn default_record_name(&self) -> Option<&str> {
        self.settings.domains.as_deref()
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating DuckDNS providers
pub struct DuckDnsFactory;

impl DnsProviderFactory for DuckDnsFactory {
    fn create(&self, settings: &Settings, client: &ClientSettings) -> Result<Box<dyn DnsProvider>> {
        let duckdns = DuckDnsSettings::from_settings(settings)?;
        Ok(Box::new(DuckDnsProvider::new(duckdns, client.http_timeout)?))
    }
}

/// Register the DuckDNS provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_duckdns::register(&registry);
/// assert!(registry.has_provider("duckdns"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider(SECTION, Box::new(DuckDnsFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv6Addr, SocketAddrV4, SocketAddrV6};

    fn provider() -> DuckDnsProvider {
        DuckDnsProvider::new(
            DuckDnsSettings {
                token: "secret-duck-token".to_string(),
                domains: Some("myhost".to_string()),
            },
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_domain_name() {
        assert_eq!(parse_domain_name("foo.duckdns.org"), "foo");
        assert_eq!(parse_domain_name("foo"), "foo");
        assert_eq!(parse_domain_name("a.b.duckdns.org"), "a.b");
        assert_eq!(qualified_name("foo.duckdns.org"), "foo.duckdns.org");
        assert_eq!(qualified_name("foo"), "foo.duckdns.org");
    }

    #[test]
    fn test_parse_api_response_updated() {
        let parsed = parse_api_response("OK\n1.2.3.4\n\nUPDATED").unwrap();
        assert_eq!(
            parsed,
            UpdateResponse {
                ipv4: Some(Ipv4Addr::new(1, 2, 3, 4)),
                ipv6: None,
                changed: true,
            }
        );
    }

    #[test]
    fn test_parse_api_response_nochange_with_ipv6() {
        let parsed = parse_api_response("OK\r\n1.2.3.4\r\n2001:db8::1\r\nNOCHANGE\r\n").unwrap();
        assert_eq!(parsed.ipv6.as_deref(), Some("2001:db8::1"));
        assert!(!parsed.changed);
    }

    #[test]
    fn test_parse_api_response_empty_ipv4() {
        let parsed = parse_api_response("OK\n\n\nNOCHANGE").unwrap();
        assert!(parsed.ipv4.is_none());
    }

    #[test]
    fn test_parse_api_response_ko() {
        let err = parse_api_response("KO").unwrap_err();
        match err {
            Error::RemoteApi { provider, message, .. } => {
                assert_eq!(provider, "duckdns");
                assert!(message.contains("KO"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_api_response_malformed() {
        assert!(matches!(parse_api_response(""), Err(Error::RemoteApi { .. })));
        assert!(matches!(parse_api_response("OK\n1.2.3.4"), Err(Error::RemoteApi { .. })));
        assert!(matches!(
            parse_api_response("OK\nnot-an-ip\n\nUPDATED"),
            Err(Error::RemoteApi { .. })
        ));
        assert!(matches!(
            parse_api_response("OK\n1.2.3.4\n\nMAYBE"),
            Err(Error::RemoteApi { .. })
        ));
    }

    #[test]
    fn test_settings_from_toml() {
        let config = Settings::from_toml_str("[Duckdns]\ntoken = \"t\"\ndomains = \"myhost\"\n").unwrap();

        let duck = DuckDnsSettings::from_settings(&config).unwrap();
        assert_eq!(duck.token, "t");
        assert_eq!(duck.domains.as_deref(), Some("myhost"));
    }

    #[test]
    fn test_settings_missing_token() {
        let config = Settings::from_toml_str("[duckdns]\ndomains = \"myhost\"\n").unwrap();

        let err = DuckDnsSettings::from_settings(&config).unwrap_err();
        assert!(matches!(err, Error::MissingOption { .. }));
    }

    #[test]
    fn test_token_not_exposed_in_debug() {
        let debug_str = format!("{:?}", provider());
        assert!(!debug_str.contains("secret-duck-token"));
        assert!(debug_str.contains("DuckDnsProvider"));
    }

    #[test]
    fn test_update_query() {
        let query = provider().update_query("myhost.duckdns.org", Ipv4Addr::new(5, 6, 7, 8));

        assert_eq!(query[0], ("domains", "myhost.duckdns.org".to_string()));
        assert_eq!(query[1], ("token", "secret-duck-token".to_string()));
        assert_eq!(query[2], ("ip", "5.6.7.8".to_string()));
        assert_eq!(query[3], ("verbose", "true".to_string()));
    }

    #[test]
    fn test_first_ipv4() {
        let v6 = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 0, 0, 0));
        let v4 = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 0));

        assert_eq!(first_ipv4(vec![v6, v4]), Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(first_ipv4(vec![v6]), None);
    }

    #[test]
    fn test_provider_defaults() {
        let provider = provider();
        assert_eq!(provider.provider_name(), "duckdns");
        assert_eq!(provider.default_record_name(), Some("myhost"));
        assert_eq!(provider.normalize_name(" myhost.duckdns.org "), "myhost");
    }

    #[test]
    fn test_register() {
        let registry = ddns_core::ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_provider("duckdns"));
    }

    #[tokio::test]
    async fn test_lookup_times_out_as_network_error() {
        let stalled = std::future::pending::<std::io::Result<Vec<SocketAddr>>>();

        let err = resolve_ipv4("myhost.duckdns.org", Duration::from_millis(20), stalled)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_lookup_resolver_failure_is_network_error() {
        let failed = async {
            Err::<Vec<SocketAddr>, _>(std::io::Error::other("no such host"))
        };

        let err = resolve_ipv4("myhost.duckdns.org", Duration::from_secs(1), failed)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_lookup_within_timeout_picks_ipv4() {
        let answered = async {
            Ok::<_, std::io::Error>(vec![
                SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 0, 0, 0)),
                SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 9), 0)),
            ])
        };

        let ip = resolve_ipv4("myhost.duckdns.org", Duration::from_secs(1), answered)
            .await
            .unwrap();

        assert_eq!(ip, Some(Ipv4Addr::new(203, 0, 113, 9)));
    }
}
