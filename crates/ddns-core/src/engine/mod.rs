//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Resolving and normalizing the record name
//! - Checking the record store before touching the provider (cache-first)
//! - Discovering unknown records once and seeding the store
//! - Updating DNS records via DnsProvider
//! - Persisting the confirmed address after successful updates
//!
//! ## Architecture
//!
//! ```text
//!                    update_dns(ip, name)
//!                             │
//!                             ▼
//!                    ┌──────────────┐
//!                    │  DdnsEngine  │
//!                    └──────────────┘
//!                             │
//!            ┌────────────────┴────────────────┐
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐              ┌─────────────────┐
//!   │  RecordStore    │              │  DnsProvider    │
//!   │ (cache, shared) │              │ (lookup/update) │
//!   └─────────────────┘              └─────────────────┘
//! ```
//!
//! ## Update Flow
//!
//! 1. Resolve the record name and normalize it into the storage key
//! 2. Look the key up in the RecordStore
//! 3. On a miss, call DnsProvider::lookup_record() once and seed the store
//! 4. If the baseline matches the current IP, return without a remote write
//! 5. Otherwise call DnsProvider::update_record() once
//! 6. On success, store the confirmed IP

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::ReconcilePolicy;
use crate::error::{Error, Result};
use crate::traits::{DdnsClient, DnsProvider, DomainRecord, RecordStore, UpdateOutcome};

/// Per-adapter engine options
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Record name used when `update_dns` is called without one
    pub default_record_name: Option<String>,

    /// Whether a cached baseline is trusted on its own
    pub reconcile: ReconcilePolicy,
}

/// Core DDNS engine
///
/// One engine is one provider adapter: a [`DnsProvider`] bound to the
/// shared [`RecordStore`]. The engine owns every store interaction; the
/// provider only talks to its remote API.
///
/// ## Threading
///
/// `update_dns` takes `&self` and holds no locks across provider calls.
/// Several engines may share one store.
pub struct DdnsEngine {
    /// DNS provider for remote reads and writes
    provider: Box<dyn DnsProvider>,

    /// Record store shared with the other adapters
    store: Arc<dyn RecordStore>,

    options: EngineOptions,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `store`: Record store implementation
    /// - `options`: Default record name and reconcile policy
    pub fn new(
        provider: Box<dyn DnsProvider>,
        store: Arc<dyn RecordStore>,
        options: EngineOptions,
    ) -> Self {
        Self {
            provider,
            store,
            options,
        }
    }

    /// Get the engine options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Resolve the record name to act on and normalize it
    ///
    /// Falls back to the configured default, then to the provider's own
    /// default.
    fn resolve_record_name(&self, record_name: Option<&str>) -> Result<String> {
        let raw = record_name
            .or(self.options.default_record_name.as_deref())
            .or(self.provider.default_record_name())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "No record name supplied or configured for {}",
                    self.provider.provider_name()
                ))
            })?;

        let normalized = self.provider.normalize_name(raw);
        if normalized.is_empty() {
            return Err(Error::config(format!(
                "Record name '{}' is empty after normalization",
                raw
            )));
        }
        Ok(normalized)
    }

    /// Load the cached record, discovering and seeding it on a miss
    ///
    /// Returns `None` when the provider has no such record either. The flag
    /// is `true` when the baseline was just read from the provider.
    async fn load_baseline(&self, name: &str) -> Result<Option<(DomainRecord, bool)>> {
        if let Some(record) = self.store.retrieve_record(name).await? {
            debug!("Cache hit for {}: {}", name, record.current_ip);
            return Ok(Some((record, false)));
        }

        debug!("Cache miss for {}, querying {}", name, self.provider.provider_name());

        let Some(remote) = self.provider.lookup_record(name).await? else {
            return Ok(None);
        };

        self.store
            .add_service(
                self.provider.provider_name(),
                name,
                remote.ip,
                remote.record_id.as_deref(),
            )
            .await?;

        // Re-read so the baseline carries the stored timestamps
        self.store
            .retrieve_record(name)
            .await?
            .map(|record| Some((record, true)))
            .ok_or_else(|| Error::state_store(format!("Record {} vanished after insert", name)))
    }

    /// Address the provider currently holds, under the remote policy
    ///
    /// Only consulted when the cached baseline already matches.
    async fn remote_ip(&self, name: &str) -> Result<Option<Ipv4Addr>> {
        let remote = self.provider.lookup_record(name).await?;
        Ok(remote.map(|r| r.ip))
    }
}

#[async_trait]
impl DdnsClient for DdnsEngine {
    async fn update_dns(
        &self,
        ip_address: Ipv4Addr,
        record_name: Option<&str>,
    ) -> Result<UpdateOutcome> {
        let name = self.resolve_record_name(record_name)?;
        let provider = self.provider.provider_name();

        let Some((baseline, discovered)) = self.load_baseline(&name).await? else {
            error!("Record {} not found on {}", name, provider);
            return Ok(UpdateOutcome::NotFound { record_name: name });
        };

        let mut previous_ip = baseline.current_ip;

        if previous_ip == ip_address {
            // A freshly discovered baseline already reflects the provider
            if discovered || self.options.reconcile != ReconcilePolicy::Remote {
                info!("IP for {} on {} is unchanged ({})", name, provider, ip_address);
                return Ok(UpdateOutcome::Unchanged { ip: ip_address });
            }

            match self.remote_ip(&name).await? {
                Some(remote) if remote != ip_address => {
                    warn!(
                        "Cached IP for {} is {} but {} reports {}",
                        name, ip_address, provider, remote
                    );
                    previous_ip = remote;
                }
                Some(_) => {
                    info!("IP for {} on {} is unchanged ({})", name, provider, ip_address);
                    return Ok(UpdateOutcome::Unchanged { ip: ip_address });
                }
                None => {
                    error!("Record {} is cached but no longer exists on {}", name, provider);
                    return Ok(UpdateOutcome::NotFound { record_name: name });
                }
            }
        }

        debug!(
            "Updating {} on {}: {} -> {}",
            name, provider, previous_ip, ip_address
        );

        let confirmed = match self
            .provider
            .update_record(&name, baseline.record_id.as_deref(), ip_address)
            .await
        {
            Ok(ip) => ip,
            Err(e @ Error::RateLimited { .. }) => {
                warn!("Update of {} on {} was rate limited: {}", name, provider, e);
                return Err(e);
            }
            Err(e) => {
                error!("Failed to update {} on {}: {}", name, provider, e);
                return Err(e);
            }
        };

        if confirmed != ip_address {
            warn!(
                "{} confirmed {} for {} instead of requested {}",
                provider, confirmed, name, ip_address
            );
        }

        self.store.update_ip(provider, &name, confirmed).await?;

        info!("Updated {} on {}: {} -> {}", name, provider, previous_ip, confirmed);
        Ok(UpdateOutcome::Updated {
            previous_ip,
            new_ip: confirmed,
        })
    }

    fn service_name(&self) -> &str {
        self.provider.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use crate::traits::RemoteRecord;

    /// Provider that strips a suffix and never reaches a remote
    struct SuffixProvider;

    #[async_trait]
    impl DnsProvider for SuffixProvider {
        async fn lookup_record(&self, _record_name: &str) -> Result<Option<RemoteRecord>> {
            Ok(None)
        }

        async fn update_record(
            &self,
            _record_name: &str,
            _record_id: Option<&str>,
            new_ip: Ipv4Addr,
        ) -> Result<Ipv4Addr> {
            Ok(new_ip)
        }

        fn normalize_name(&self, record_name: &str) -> String {
            record_name.trim().trim_end_matches(".test.org").to_string()
        }

        fn default_record_name(&self) -> Option<&str> {
            Some("fallback.test.org")
        }

        fn provider_name(&self) -> &'static str {
            "suffix"
        }
    }

    fn engine(default_record_name: Option<&str>) -> DdnsEngine {
        DdnsEngine::new(
            Box::new(SuffixProvider),
            Arc::new(MemoryRecordStore::new()),
            EngineOptions {
                default_record_name: default_record_name.map(str::to_string),
                reconcile: ReconcilePolicy::Cache,
            },
        )
    }

    #[test]
    fn test_resolve_record_name_precedence() {
        let engine = engine(Some("configured.test.org"));

        assert_eq!(engine.resolve_record_name(Some("host.test.org")).unwrap(), "host");
        assert_eq!(engine.resolve_record_name(None).unwrap(), "configured");

        let engine = self::engine(None);
        assert_eq!(engine.resolve_record_name(None).unwrap(), "fallback");
    }

    #[test]
    fn test_resolve_record_name_rejects_empty() {
        let engine = engine(None);
        let err = engine.resolve_record_name(Some("   ")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = engine.resolve_record_name(Some(".test.org")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let engine = engine(None);

        let outcome = engine
            .update_dns(Ipv4Addr::new(1, 2, 3, 4), Some("ghost.test.org"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::NotFound {
                record_name: "ghost".to_string()
            }
        );
        assert_eq!(engine.service_name(), "suffix");
    }
}
