// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Same semantics as the SQLite store without persistence. Useful for tests
// and for runs where re-discovering every record on start is acceptable.
//
// ## Crash Behavior
//
// - All records are lost on restart
// - The first run after a restart performs one remote discovery per domain

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::record_store::{DomainRecord, RecordStore, advance_timestamp, validate_key};

/// In-memory record store implementation
///
/// Records are kept in a HashMap keyed by domain name, behind a RwLock.
/// Clones share the same map.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::store::MemoryRecordStore;
/// use ddns_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///
///     store.add_service("duckdns", "myhost", "1.2.3.4".parse()?, None).await?;
///
///     let record = store.retrieve_record("myhost").await?;
///     assert_eq!(record.map(|r| r.current_ip), Some("1.2.3.4".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<HashMap<String, DomainRecord>>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn add_service(
        &self,
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
        record_id: Option<&str>,
    ) -> Result<(), Error> {
        validate_key(service, domain_name)?;

        let mut guard = self.inner.write().await;
        if guard.contains_key(domain_name) {
            return Err(Error::duplicate(service, domain_name));
        }

        let record = DomainRecord::new(service, domain_name, current_ip, record_id);
        guard.insert(domain_name.to_string(), record);

        tracing::debug!(
            "Added record: service={}, domain={}, ip={}",
            service,
            domain_name,
            current_ip
        );
        Ok(())
    }

    async fn update_ip(
        &self,
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .get_mut(domain_name)
            .ok_or_else(|| Error::not_found(domain_name))?;

        record.current_ip = current_ip;
        record.last_updated = advance_timestamp(record.last_updated);

        tracing::info!("Updated {} on {} to {}", domain_name, service, current_ip);
        Ok(())
    }

    async fn retrieve_record(&self, domain_name: &str) -> Result<Option<DomainRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(domain_name).cloned())
    }

    async fn list_records(&self) -> Result<Vec<DomainRecord>, Error> {
        let guard = self.inner.read().await;
        let mut records: Vec<DomainRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.domain_name.cmp(&b.domain_name));
        Ok(records)
    }

    async fn reset(&self) -> Result<(), Error> {
        tracing::warn!("Record store reset requested; dropping all records");
        self.inner.write().await.clear();
        Ok(())
    }
}
