//! Plugin-based provider registry
//!
//! The registry allows DNS providers to be registered dynamically at
//! runtime, keyed by the configuration section that enables them. This
//! avoids hardcoded if-else chains in the runner.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::registry::ProviderRegistry;
//!
//! // Create a registry
//! let registry = ProviderRegistry::new();
//!
//! // Register providers
//! registry.register_provider("cloudflare", Box::new(cloudflare_factory));
//!
//! // Build an adapter for every configured section
//! for section in registry.configured_providers(&settings) {
//!     let client = registry.create_client(&section, &settings, &client_settings, store.clone())?;
//! }
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In ddns-provider-cloudflare crate
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::{ClientSettings, Settings};
use crate::engine::{DdnsEngine, EngineOptions};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, RecordStore};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

type FactoryMap = HashMap<String, Box<dyn DnsProviderFactory>>;

/// Provider registry for plugin-based DNS provider creation
///
/// The registry maintains a map of section names to factory objects,
/// allowing dynamic instantiation of providers based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories, keyed by lowercase section name
    providers: RwLock<FactoryMap>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Factories are only inserted whole, so a poisoned map is still consistent
    fn factories(&self) -> RwLockReadGuard<'_, FactoryMap> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Section name that enables the provider (e.g., "cloudflare")
    /// - `factory`: Factory object for creating provider instances
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let name = name.into().to_ascii_lowercase();
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name, factory);
    }

    /// Create a DNS provider from its settings section
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If the provider is not registered or creation fails
    pub fn create_provider(
        &self,
        name: &str,
        settings: &Settings,
        client: &ClientSettings,
    ) -> Result<Box<dyn DnsProvider>> {
        let providers = self.factories();

        let factory = providers
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", name)))?;

        factory.create(settings, client)
    }

    /// Create a provider adapter bound to the shared record store
    ///
    /// The engine takes its reconcile policy from `client`; the default
    /// record name comes from the provider itself.
    pub fn create_client(
        &self,
        name: &str,
        settings: &Settings,
        client: &ClientSettings,
        store: Arc<dyn RecordStore>,
    ) -> Result<DdnsEngine> {
        let provider = self.create_provider(name, settings, client)?;

        let options = EngineOptions {
            default_record_name: None,
            reconcile: client.reconcile,
        };

        Ok(DdnsEngine::new(provider, store, options))
    }

    /// Registered providers whose section is present in `settings`
    ///
    /// Sorted by name so runs are reproducible.
    pub fn configured_providers(&self, settings: &Settings) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories()
            .keys()
            .filter(|name| settings.has_section(name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories().contains_key(&name.to_ascii_lowercase())
    }
}
