//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides minimal test doubles that verify architectural
//! constraints without talking to a real provider.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, IpSource, RemoteRecord};
use ddns_core::{DdnsEngine, EngineOptions, MemoryRecordStore, ReconcilePolicy, RecordStore};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How the mock provider answers update_record()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBehavior {
    /// Confirm the requested address
    Echo,
    /// Confirm a fixed address regardless of the request
    Confirm(Ipv4Addr),
    /// Fail with a provider error envelope
    RemoteError,
    /// Fail with HTTP 429
    RateLimited,
    /// Fail with a transport error
    NetworkError,
}

/// A mock DnsProvider that tracks calls
///
/// The "remote" side is a single optional record that lookups return and
/// successful updates overwrite.
pub struct MockDnsProvider {
    /// Call counter for lookup_record()
    lookup_call_count: Arc<AtomicUsize>,
    /// Call counter for update_record()
    update_call_count: Arc<AtomicUsize>,
    /// (record name, record id, ip) of every update call
    updates: Arc<Mutex<Vec<(String, Option<String>, Ipv4Addr)>>>,
    /// Record the remote currently holds
    remote: Arc<Mutex<Option<RemoteRecord>>>,
    behavior: Arc<Mutex<UpdateBehavior>>,
    /// Provider name
    pub name: &'static str,
    /// Suffix stripped by normalize_name()
    suffix: Option<&'static str>,
}

impl MockDnsProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            lookup_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            remote: Arc::new(Mutex::new(None)),
            behavior: Arc::new(Mutex::new(UpdateBehavior::Echo)),
            name,
            suffix: None,
        }
    }

    /// Seed the remote side with one A record
    pub fn with_remote(self, name: &str, ip: Ipv4Addr, record_id: Option<&str>) -> Self {
        *self.remote.lock().unwrap() = Some(RemoteRecord {
            name: name.to_string(),
            ip,
            record_id: record_id.map(str::to_string),
        });
        self
    }

    /// Strip `suffix` from record names, the way DuckDNS does
    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn set_behavior(&self, behavior: UpdateBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Change the remote address behind the engine's back
    pub fn set_remote_ip(&self, ip: Ipv4Addr) {
        if let Some(record) = self.remote.lock().unwrap().as_mut() {
            record.ip = ip;
        }
    }

    /// Get the number of times lookup_record() was called
    pub fn lookup_call_count(&self) -> usize {
        self.lookup_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Total remote calls of any kind
    pub fn remote_call_count(&self) -> usize {
        self.lookup_call_count() + self.update_call_count()
    }

    /// Get the list of update calls
    pub fn updates(&self) -> Vec<(String, Option<String>, Ipv4Addr)> {
        self.updates.lock().unwrap().clone()
    }

    /// Create a new MockDnsProvider that shares counters and remote state
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            lookup_call_count: Arc::clone(&other.lookup_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            updates: Arc::clone(&other.updates),
            remote: Arc::clone(&other.remote),
            behavior: Arc::clone(&other.behavior),
            name: other.name,
            suffix: other.suffix,
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn lookup_record(&self, record_name: &str) -> Result<Option<RemoteRecord>> {
        self.lookup_call_count.fetch_add(1, Ordering::SeqCst);

        let remote = self.remote.lock().unwrap().clone();
        Ok(remote.filter(|r| self.normalize_name(&r.name) == record_name))
    }

    async fn update_record(
        &self,
        record_name: &str,
        record_id: Option<&str>,
        new_ip: Ipv4Addr,
    ) -> Result<Ipv4Addr> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().unwrap().push((
            record_name.to_string(),
            record_id.map(str::to_string),
            new_ip,
        ));

        let behavior = *self.behavior.lock().unwrap();
        let confirmed = match behavior {
            UpdateBehavior::Echo => new_ip,
            UpdateBehavior::Confirm(ip) => ip,
            UpdateBehavior::RemoteError => {
                return Err(Error::remote(self.name, "Record update rejected"));
            }
            UpdateBehavior::RateLimited => {
                return Err(Error::from_status(self.name, 429, ""));
            }
            UpdateBehavior::NetworkError => {
                return Err(Error::network("connection reset by peer"));
            }
        };

        self.set_remote_ip(confirmed);
        Ok(confirmed)
    }

    fn normalize_name(&self, record_name: &str) -> String {
        let trimmed = record_name.trim();
        match self.suffix {
            Some(suffix) => trimmed.strip_suffix(suffix).unwrap_or(trimmed).to_string(),
            None => trimmed.to_string(),
        }
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// An IP source that always answers the same address
pub struct StaticIpSource {
    ip: Ipv4Addr,
    call_count: AtomicUsize,
}

impl StaticIpSource {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.ip)
    }

    fn source_name(&self) -> &str {
        "static"
    }
}

/// An IP source whose every query fails
pub struct FailingIpSource;

#[async_trait::async_trait]
impl IpSource for FailingIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        Err(Error::network("all IP services unreachable"))
    }

    fn source_name(&self) -> &str {
        "failing"
    }
}

/// Helper to create an engine over a fresh in-memory store
///
/// Returns the engine and the store so tests can inspect cached rows.
pub fn engine_with_memory_store(
    provider: &MockDnsProvider,
    reconcile: ReconcilePolicy,
) -> (DdnsEngine, Arc<dyn RecordStore>) {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let engine = engine_with_store(provider, Arc::clone(&store), reconcile);
    (engine, store)
}

/// Helper to create an engine over an existing store
pub fn engine_with_store(
    provider: &MockDnsProvider,
    store: Arc<dyn RecordStore>,
    reconcile: ReconcilePolicy,
) -> DdnsEngine {
    DdnsEngine::new(
        Box::new(MockDnsProvider::sharing_counters_with(provider)),
        store,
        EngineOptions {
            default_record_name: None,
            reconcile,
        },
    )
}
