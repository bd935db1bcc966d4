// # Record Store Trait
//
// Defines the interface for the local cache of provider DNS state.
//
// ## Purpose
//
// The record store keeps, per domain:
// - The last known IPv4 address
// - The provider-assigned record identifier
// - Creation and last-update timestamps
//
// This lets the engine skip remote reads once a domain is cached, and skip
// remote writes when the IP has not changed.
//
// ## Implementations
//
// - SQLite: `SqliteRecordStore` (persistent, `domains` table)
// - Memory: `MemoryRecordStore` (tests, ephemeral runs)
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::RecordStore;
// use std::net::Ipv4Addr;
//
// let store = /* RecordStore implementation */;
//
// store.add_service("cloudflare", "example.com", Ipv4Addr::new(1, 2, 3, 4), Some("rid")).await?;
// let record = store.retrieve_record("example.com").await?;
// ```

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::net::Ipv4Addr;

use crate::Error;

/// One cached row per (service, domain)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DomainRecord {
    /// Provider that owns the record (e.g. "cloudflare")
    pub service: String,
    /// Storage key; unique across the store
    pub domain_name: String,
    /// Provider-assigned identifier of the remote record, if known
    pub record_id: Option<String>,
    /// Last known IPv4 address
    pub current_ip: Ipv4Addr,
    /// Timestamp of the last write
    pub last_updated: DateTime<Utc>,
    /// Timestamp of insertion
    pub created_at: DateTime<Utc>,
}

impl DomainRecord {
    /// Create a record stamped with the current time
    ///
    /// # Visibility
    ///
    /// Records are only created by `RecordStore` implementations.
    pub(crate) fn new(
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
        record_id: Option<&str>,
    ) -> Self {
        let now = now_micros();
        Self {
            service: service.to_string(),
            domain_name: domain_name.to_string(),
            record_id: record_id.map(str::to_string),
            current_ip,
            last_updated: now,
            created_at: now,
        }
    }
}

/// Current time truncated to the precision the SQLite store keeps
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for the next write to a record last written at `previous`
///
/// Always strictly later than `previous`, even if the clock has not moved
/// or went backwards.
pub(crate) fn advance_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::milliseconds(1)
    }
}

/// Reject empty keys before they reach the backing storage
pub(crate) fn validate_key(service: &str, domain_name: &str) -> Result<(), Error> {
    if service.trim().is_empty() {
        return Err(Error::invalid_input("service name cannot be empty"));
    }
    if domain_name.trim().is_empty() {
        return Err(Error::invalid_input("domain name cannot be empty"));
    }
    Ok(())
}

/// Trait for record store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage (files, databases)
/// - ✅ Use locks or transactions to keep writes atomic
///
/// ## Forbidden Capabilities
/// - ❌ Call provider APIs (owned by `DnsProvider`)
/// - ❌ Decide whether an update is needed (owned by `DdnsEngine`)
///
/// # Atomicity
///
/// Every mutating method either applies fully or not at all. Implementations
/// must stay consistent when one instance is shared by several engines and
/// called sequentially.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record
    ///
    /// # Errors
    ///
    /// - `Error::DuplicateRecord` if the domain already has a record
    /// - `Error::InvalidInput` if `service` or `domain_name` is empty
    async fn add_service(
        &self,
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
        record_id: Option<&str>,
    ) -> Result<(), Error>;

    /// Update the IP of the record matching `domain_name`
    ///
    /// Refreshes `last_updated`, which strictly advances. `service` is only
    /// used for logging; the lookup is by domain alone.
    ///
    /// # Errors
    ///
    /// - `Error::RecordNotFound` if no record matches
    async fn update_ip(
        &self,
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
    ) -> Result<(), Error>;

    /// Get the record for a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DomainRecord))`: The cached record
    /// - `Ok(None)`: No record found
    async fn retrieve_record(&self, domain_name: &str) -> Result<Option<DomainRecord>, Error>;

    /// List all records, ordered by domain name
    async fn list_records(&self) -> Result<Vec<DomainRecord>, Error>;

    /// Drop and recreate the backing structure
    ///
    /// Intended for tests and maintenance only.
    async fn reset(&self) -> Result<(), Error>;
}
