// # IP Source Trait
//
// Defines the interface for discovering the host's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP IP-echo services: `ddns-ip-http` crate

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for IP source implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform outbound requests to IP-echo services
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Access the record store
/// - ❌ Spawn background tasks or polling loops
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current address
    /// - `Err(Error::Network)`: Transport failure or an error status
    /// - `Err(Error)`: The service answered with something other than an IPv4 address
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Name used in logs
    fn source_name(&self) -> &str;
}
