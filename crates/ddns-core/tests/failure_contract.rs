//! Architectural Contract Test: Failure Isolation
//!
//! This test verifies that provider failures propagate to the caller and
//! never corrupt the record store.
//!
//! Constraints verified:
//! - A failed remote update leaves the cached record untouched
//! - Rate limiting surfaces as its own error variant
//! - No hidden retries: one failed call means one remote attempt
//! - IP discovery failures reach the caller
//!
//! Architectural boundaries:
//! - ✅ CALLER: Can implement retry policy using `Error::is_retryable`
//! - ❌ ENGINE / PROVIDER: Must NOT retry on their own
//!
//! If this test fails, someone has hidden an error or added automatic retries.

mod common;

use common::*;
use ddns_core::{
    DdnsClient, Error, MemoryRecordStore, RecordStore, ReconcilePolicy, UpdateOutcome,
    resolve_current_ip,
};
use std::net::Ipv4Addr;
use std::sync::Arc;

async fn cached_engine(
    behavior: UpdateBehavior,
) -> (MockDnsProvider, ddns_core::DdnsEngine, Arc<dyn RecordStore>) {
    let provider = MockDnsProvider::new("cloudflare");
    provider.set_behavior(behavior);

    let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    store
        .add_service("cloudflare", "example.com", Ipv4Addr::new(1, 1, 1, 1), Some("rid"))
        .await
        .unwrap();

    let engine = engine_with_store(&provider, Arc::clone(&store), ReconcilePolicy::Cache);
    (provider, engine, store)
}

#[tokio::test]
async fn failed_update_leaves_store_unchanged() {
    let (provider, engine, store) = cached_engine(UpdateBehavior::RemoteError).await;
    let before = store.retrieve_record("example.com").await.unwrap().unwrap();

    let err = engine
        .update_dns(Ipv4Addr::new(9, 9, 9, 9), Some("example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RemoteApi { .. }));
    assert_eq!(provider.update_call_count(), 1, "No hidden retries");

    let after = store.retrieve_record("example.com").await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn rate_limit_is_a_distinct_error() {
    let (provider, engine, store) = cached_engine(UpdateBehavior::RateLimited).await;

    let err = engine
        .update_dns(Ipv4Addr::new(9, 9, 9, 9), Some("example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RateLimited { .. }));
    assert!(err.is_retryable());
    assert_eq!(provider.update_call_count(), 1);

    let record = store.retrieve_record("example.com").await.unwrap().unwrap();
    assert_eq!(record.current_ip, Ipv4Addr::new(1, 1, 1, 1));
}

#[tokio::test]
async fn network_failure_propagates() {
    let (provider, engine, _store) = cached_engine(UpdateBehavior::NetworkError).await;

    let err = engine
        .update_dns(Ipv4Addr::new(9, 9, 9, 9), Some("example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert_eq!(provider.update_call_count(), 1);
}

#[tokio::test]
async fn retry_after_failure_is_left_to_the_caller() {
    let (provider, engine, store) = cached_engine(UpdateBehavior::NetworkError).await;
    let new_ip = Ipv4Addr::new(9, 9, 9, 9);

    assert!(engine.update_dns(new_ip, Some("example.com")).await.is_err());

    // The cache still holds the old address, so the next call tries again
    provider.set_behavior(UpdateBehavior::Echo);
    let outcome = engine.update_dns(new_ip, Some("example.com")).await.unwrap();

    assert!(outcome.is_updated());
    assert_eq!(provider.update_call_count(), 2);
    assert_eq!(
        store.retrieve_record("example.com").await.unwrap().unwrap().current_ip,
        new_ip
    );
}

#[tokio::test]
async fn confirmed_ip_is_what_gets_stored() {
    let confirmed = Ipv4Addr::new(8, 8, 8, 8);
    let (_provider, engine, store) = cached_engine(UpdateBehavior::Confirm(confirmed)).await;

    let outcome = engine
        .update_dns(Ipv4Addr::new(9, 9, 9, 9), Some("example.com"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            previous_ip: Ipv4Addr::new(1, 1, 1, 1),
            new_ip: confirmed,
        }
    );
    assert_eq!(
        store.retrieve_record("example.com").await.unwrap().unwrap().current_ip,
        confirmed
    );
}

#[tokio::test]
async fn ip_discovery_failure_reaches_the_caller() {
    let err = resolve_current_ip(&FailingIpSource).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));

    let source = StaticIpSource::new(Ipv4Addr::new(203, 0, 113, 7));
    let ip = resolve_current_ip(&source).await.unwrap();
    assert_eq!(ip, Ipv4Addr::new(203, 0, 113, 7));
    assert_eq!(source.call_count(), 1);
}
