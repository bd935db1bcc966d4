// # ddnsd - DDNS Runner
//
// CRITICAL RULES:
// - This is a THIN integration layer ONLY
// - DO NOT add business logic, DNS logic, or retry logic here
// - All DDNS logic MUST be in ddns-core and the provider crates
//
// One invocation performs one update pass:
// 1. Load the TOML configuration
// 2. Initialize logging
// 3. Open the record store
// 4. Discover the current public IP once
// 5. Run every configured provider, sequentially
//
// Schedule it with cron or a systemd timer.
//
// ## Environment
//
// - `DDNS_CONFIG`: Path to the configuration file (default `ddns.toml`)
// - `DDNS_LOG_LEVEL`: Overrides `client.logging_level`
// - `DDNS_RESET_STORE`: `true` drops and recreates the record store first
//
// ## Example
//
// ```bash
// export DDNS_CONFIG=/etc/ddns/ddns.toml
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::{
    ClientSettings, DdnsClient, ProviderRegistry, RecordStore, Settings, SqliteRecordStore,
    UpdateOutcome, resolve_current_ip,
};
use ddns_ip_http::HttpIpSource;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG_PATH: &str = "ddns.toml";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Every provider succeeded
/// - 1: Configuration or startup error
/// - 2: Runtime error (IP discovery or a provider failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean run (normal exit)
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Runner options taken from the environment
#[derive(Debug)]
struct RunnerEnv {
    config_path: PathBuf,
    log_level: Option<String>,
    reset_store: bool,
}

impl RunnerEnv {
    /// Load runner options from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            config_path: lookup("DDNS_CONFIG")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            log_level: lookup("DDNS_LOG_LEVEL").filter(|l| !l.trim().is_empty()),
            reset_store: lookup("DDNS_RESET_STORE").is_some_and(|v| is_truthy(&v)),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    let runner = RunnerEnv::from_env();

    // Load configuration
    let settings = match Settings::load(&runner.config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let client = match ClientSettings::from_settings(&settings) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let level_name = runner
        .log_level
        .as_deref()
        .unwrap_or(&client.logging_level);
    let Some(log_level) = parse_level(level_name) else {
        eprintln!(
            "DDNS_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            level_name
        );
        return DdnsExitCode::ConfigError.into();
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd with {}", runner.config_path.display());

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(settings, client, runner.reset_store)).into()
}

/// Create the provider registry with every compiled-in provider
fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    ddns_provider_cloudflare::register(&registry);

    #[cfg(feature = "duckdns")]
    ddns_provider_duckdns::register(&registry);

    registry
}

async fn open_store(client: &ClientSettings, reset: bool) -> Result<Arc<dyn RecordStore>> {
    let store = SqliteRecordStore::connect(&client.database)
        .await
        .with_context(|| format!("Failed to open record store at {}", client.database))?;

    if reset {
        warn!("DDNS_RESET_STORE is set; resetting the record store");
        store.reset().await.context("Failed to reset the record store")?;
    }

    Ok(Arc::new(store))
}

/// One update pass over every configured provider
async fn run(settings: Settings, client: ClientSettings, reset_store: bool) -> DdnsExitCode {
    let registry = build_registry();

    let providers = registry.configured_providers(&settings);
    if providers.is_empty() {
        error!(
            "No provider configured. Add one of these sections: {}",
            registry.list_providers().join(", ")
        );
        return DdnsExitCode::ConfigError;
    }

    // Build every adapter before touching the network
    let store = match open_store(&client, reset_store).await {
        Ok(store) => store,
        Err(e) => {
            error!("{:#}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let mut clients = Vec::with_capacity(providers.len());
    for name in &providers {
        match registry.create_client(name, &settings, &client, Arc::clone(&store)) {
            Ok(adapter) => clients.push(adapter),
            Err(e) => {
                error!("Failed to configure provider {}: {}", name, e);
                return DdnsExitCode::ConfigError;
            }
        }
    }

    let ip_source = match HttpIpSource::from_client_settings(&client) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to configure IP discovery: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let ip = match resolve_current_ip(&ip_source).await {
        Ok(ip) => ip,
        Err(e) => {
            error!("Could not determine the public IP address: {}", e);
            return DdnsExitCode::RuntimeError;
        }
    };

    let mut failures = 0usize;
    for adapter in &clients {
        let service = adapter.service_name();
        match adapter.update_dns(ip, None).await {
            Ok(UpdateOutcome::Updated { previous_ip, new_ip }) => {
                info!("{}: updated {} -> {}", service, previous_ip, new_ip);
            }
            Ok(UpdateOutcome::Unchanged { ip }) => {
                info!("{}: no update needed ({})", service, ip);
            }
            Ok(UpdateOutcome::NotFound { record_name }) => {
                warn!("{}: record {} does not exist, nothing updated", service, record_name);
            }
            Err(e) => {
                error!("{}: update failed: {}", service, e);
                if e.is_retryable() {
                    warn!("{}: the failure is transient; the next run will retry", service);
                }
                failures += 1;
            }
        }
    }

    match store.list_records().await {
        Ok(records) => {
            for record in &records {
                debug!(
                    "cached {}/{} -> {} (updated {})",
                    record.service,
                    record.domain_name,
                    record.current_ip,
                    record.last_updated.to_rfc3339()
                );
            }
            info!("Record store holds {} record(s)", records.len());
        }
        Err(e) => warn!("Could not list cached records: {}", e),
    }

    if failures > 0 {
        error!("{} of {} provider(s) failed", failures, clients.len());
        DdnsExitCode::RuntimeError
    } else {
        info!("Update pass complete for {} provider(s)", clients.len());
        DdnsExitCode::Success
    }
}
