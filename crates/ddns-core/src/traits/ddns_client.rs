// # DDNS Client Contract
//
// The capability every provider adapter exposes: bring one A record in
// line with the host's current public address.
//
// `resolve_current_ip` is the shared helper adapters and callers use to
// obtain that address; it is a free function over any `IpSource`.
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DdnsClient, resolve_current_ip};
//
// let ip = resolve_current_ip(&ip_source).await?;
// let outcome = client.update_dns(ip, Some("home.example.com")).await?;
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tracing::{debug, error, info};

use crate::traits::IpSource;

/// Result of an `update_dns` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The cached address already matched; nothing was sent to the provider
    Unchanged {
        /// The current address
        ip: Ipv4Addr,
    },
    /// The provider accepted the new address and the cache was refreshed
    Updated {
        /// The address the record pointed to before
        previous_ip: Ipv4Addr,
        /// The address the provider confirmed
        new_ip: Ipv4Addr,
    },
    /// Neither the cache nor the provider knows the record
    NotFound {
        /// The normalized record name that was looked up
        record_name: String,
    },
}

impl UpdateOutcome {
    /// Whether a remote write happened
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Trait implemented by every provider adapter
#[async_trait]
pub trait DdnsClient: Send + Sync {
    /// Make `record_name` point at `ip_address`
    ///
    /// `ip_address` is the true current public address, obtained by the
    /// caller (see [`resolve_current_ip`]). When `record_name` is `None` the
    /// adapter falls back to its configured default.
    ///
    /// # Idempotency
    ///
    /// Calling this twice with the same address issues at most one remote
    /// write: the second call finds the address in the record store.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration`: no record name supplied or configured
    /// - `Error::RemoteApi` / `Error::RateLimited`: the provider refused
    /// - `Error::Network`: transport failure
    ///
    /// On any error the record store is left unchanged.
    async fn update_dns(
        &self,
        ip_address: Ipv4Addr,
        record_name: Option<&str>,
    ) -> Result<UpdateOutcome, crate::Error>;

    /// Service name the adapter stores records under
    fn service_name(&self) -> &str;
}

/// Query an IP source for the host's current public IPv4 address
///
/// Callers treat a failure as fatal for the current run.
pub async fn resolve_current_ip(source: &dyn IpSource) -> Result<Ipv4Addr, crate::Error> {
    debug!(
        "Attempting to retrieve current public IP address from {}",
        source.source_name()
    );

    match source.current().await {
        Ok(ip) => {
            info!("Current IPv4 is {}", ip);
            Ok(ip)
        }
        Err(e) => {
            error!("Error getting IP from {}: {}", source.source_name(), e);
            Err(e)
        }
    }
}
