// # DNS Provider Trait
//
// Defines the interface to a provider's remote DNS API.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
// - DuckDNS: `ddns-provider-duckdns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// let provider = /* DnsProvider implementation */;
//
// // One-time discovery of the remote record
// let remote = provider.lookup_record("example.com").await?;
//
// // Push a new address
// let confirmed = provider
//     .update_record("example.com", Some("record-id"), "1.2.3.4".parse()?)
//     .await?;
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::config::{ClientSettings, Settings};

/// A DNS record as seen on the provider side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// The record name as the provider reports it
    pub name: String,
    /// The address the record currently points to
    pub ip: Ipv4Addr,
    /// The provider-specific record identifier, if the provider has one
    pub record_id: Option<String>,
}

/// Trait for DNS provider implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls (or DNS queries) to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (callers own retry policy)
/// - ❌ Access the record store (owned by `DdnsEngine`)
/// - ❌ Decide whether an update is needed (owned by `DdnsEngine`)
/// - ❌ Cache state beyond a single request (owned by `RecordStore`)
///
/// Every method issues at most one remote call. Errors are translated into
/// `ddns_core::Error` at the call site: transport failures become
/// `Error::Network`, error statuses go through `Error::from_status`.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Discover the remote A record for `record_name`
    ///
    /// Called once per domain, on a record store miss.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RemoteRecord))`: The record exists remotely
    /// - `Ok(None)`: The provider has no such record
    /// - `Err(Error)`: The lookup failed
    async fn lookup_record(&self, record_name: &str) -> Result<Option<RemoteRecord>, crate::Error>;

    /// Point `record_name` at `new_ip`
    ///
    /// # Parameters
    ///
    /// - `record_name`: Normalized record name
    /// - `record_id`: Identifier cached from discovery, for providers that need one
    /// - `new_ip`: The address to set
    ///
    /// # Returns
    ///
    /// The address the provider confirmed after the update.
    async fn update_record(
        &self,
        record_name: &str,
        record_id: Option<&str>,
        new_ip: Ipv4Addr,
    ) -> Result<Ipv4Addr, crate::Error>;

    /// Map a user-facing name to the form used as the storage key
    fn normalize_name(&self, record_name: &str) -> String {
        record_name.trim().to_string()
    }

    /// Record name to use when the caller does not supply one
    fn default_record_name(&self) -> Option<&str> {
        None
    }

    /// Get the provider name (stored as the record's service)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider from the provider's settings section
    ///
    /// # Errors
    ///
    /// `Error::Configuration` or `Error::MissingOption` when credentials are absent.
    fn create(
        &self,
        settings: &Settings,
        client: &ClientSettings,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
