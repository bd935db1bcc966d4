//! Core traits for the DDNS updater
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RecordStore`]: Local cache of provider DNS state
//! - [`DnsProvider`]: Stateless access to a provider's remote API
//! - [`IpSource`]: Discovery of the current public address
//! - [`DdnsClient`]: The update contract every adapter implements

pub mod ddns_client;
pub mod dns_provider;
pub mod ip_source;
pub mod record_store;

pub use ddns_client::{DdnsClient, UpdateOutcome, resolve_current_ip};
pub use dns_provider::{DnsProvider, DnsProviderFactory, RemoteRecord};
pub use ip_source::IpSource;
pub use record_store::{DomainRecord, RecordStore};
