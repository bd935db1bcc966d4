// # ddns-core
//
// Core library for the one-shot DDNS updater.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **IpSource**: Trait for discovering the host's public IPv4 address
// - **DnsProvider**: Trait for reading and updating A records via provider APIs
// - **RecordStore**: Trait for the local record cache (idempotency)
// - **DdnsClient**: The update contract every provider adapter exposes
// - **DdnsEngine**: Cache-first adapter that binds a DnsProvider to the store
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider implementations
// 2. **Cache-First**: The record store is consulted before any remote read
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Repeated updates with the same address never reach the provider

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{ClientSettings, ReconcilePolicy, Settings};
pub use engine::{DdnsEngine, EngineOptions};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;
pub use store::{MemoryRecordStore, SqliteRecordStore};
pub use traits::{
    DdnsClient, DnsProvider, DnsProviderFactory, DomainRecord, IpSource, RecordStore,
    RemoteRecord, UpdateOutcome, resolve_current_ip,
};
