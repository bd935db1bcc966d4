//! Configuration for the DDNS updater
//!
//! Settings live in a TOML file made of sections (tables). Adapters read
//! them through [`Settings::get`], which fails with
//! [`Error::MissingOption`] when an option is absent. Typed views such as
//! [`ClientSettings`] are built on top of that accessor.
//!
//! ```toml
//! [client]
//! logging_level = "info"
//! database = "ddns.db"
//!
//! [cloudflare]
//! api_token = "..."
//! zone_id = "..."
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Section holding settings shared by every provider
pub const CLIENT_SECTION: &str = "client";

/// Default IP-echo services, in fallback order
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://cloudflare.com/cdn-cgi/trace",
];

const DEFAULT_DATABASE: &str = "ddns.db";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Read-only key/value settings grouped in sections
#[derive(Debug, Clone, Default)]
pub struct Settings {
    source: Option<PathBuf>,
    table: toml::Table,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.source = Some(path.to_path_buf());

        tracing::debug!(
            "Loaded configuration from {} ({} section(s))",
            path.display(),
            settings.table.len()
        );
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e| Error::config(format!("Invalid configuration: {}", e)))?;

        for (name, value) in &table {
            if !value.is_table() {
                return Err(Error::config(format!(
                    "Top-level key '{}' must be a section",
                    name
                )));
            }
        }

        Ok(Self {
            source: None,
            table,
        })
    }

    /// File the settings were loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Retrieve a scalar option as a string
    ///
    /// Section and option names are matched case-insensitively.
    pub fn get(&self, section: &str, option: &str) -> Result<String> {
        let value = self
            .lookup(section, option)
            .ok_or_else(|| Error::missing_option(section, option))?;

        scalar_to_string(value).ok_or_else(|| {
            Error::config(format!(
                "Option '{}' in section '{}' must be a scalar value",
                option, section
            ))
        })
    }

    /// Retrieve an option, mapping absence to `None`
    pub fn get_opt(&self, section: &str, option: &str) -> Result<Option<String>> {
        match self.get(section, option) {
            Ok(value) => Ok(Some(value)),
            Err(Error::MissingOption { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Retrieve an option holding a list of strings
    ///
    /// A single string is accepted as a one-element list.
    pub fn get_list(&self, section: &str, option: &str) -> Result<Vec<String>> {
        let value = self
            .lookup(section, option)
            .ok_or_else(|| Error::missing_option(section, option))?;

        match value {
            toml::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::config(format!(
                            "Option '{}' in section '{}' must contain strings only",
                            option, section
                        ))
                    })
                })
                .collect(),
            toml::Value::String(s) => Ok(vec![s.clone()]),
            _ => Err(Error::config(format!(
                "Option '{}' in section '{}' must be a list of strings",
                option, section
            ))),
        }
    }

    /// Check whether a section is present
    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// Names of all sections
    pub fn sections(&self) -> Vec<String> {
        self.table.keys().cloned().collect()
    }

    fn section(&self, section: &str) -> Option<&toml::Table> {
        self.table
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(section))
            .and_then(|(_, value)| value.as_table())
    }

    fn lookup(&self, section: &str, option: &str) -> Option<&toml::Value> {
        self.section(section)?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(option))
            .map(|(_, value)| value)
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// How the engine treats a cached record whose IP already matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Trust the local cache; never re-read the provider once cached
    #[default]
    Cache,
    /// Also read the provider's record and repair out-of-band changes
    Remote,
}

impl std::str::FromStr for ReconcilePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cache" => Ok(Self::Cache),
            "remote" => Ok(Self::Remote),
            other => Err(Error::config(format!(
                "Invalid reconcile policy '{}'. Expected cache or remote",
                other
            ))),
        }
    }
}

/// Settings shared by every provider (`[client]` section)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Log level (trace, debug, info, warn, error)
    pub logging_level: String,

    /// SQLite database path, or `:memory:`
    pub database: String,

    /// Upper bound on every outbound HTTP call
    pub http_timeout: Duration,

    /// Reconciliation policy for cached records
    pub reconcile: ReconcilePolicy,

    /// IP-echo services, tried in order
    pub ip_services: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            logging_level: "info".to_string(),
            database: DEFAULT_DATABASE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            reconcile: ReconcilePolicy::default(),
            ip_services: DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClientSettings {
    /// Build from the `[client]` section, falling back to defaults
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut client = Self::default();

        if let Some(level) = settings.get_opt(CLIENT_SECTION, "logging_level")? {
            client.logging_level = level.trim().to_lowercase();
        }

        if let Some(database) = settings.get_opt(CLIENT_SECTION, "database")? {
            client.database = database;
        }

        if let Some(timeout) = settings.get_opt(CLIENT_SECTION, "http_timeout_secs")? {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                Error::config(format!("http_timeout_secs must be an integer. Got: {}", timeout))
            })?;
            client.http_timeout = Duration::from_secs(secs);
        }

        if let Some(policy) = settings.get_opt(CLIENT_SECTION, "reconcile")? {
            client.reconcile = policy.parse()?;
        }

        match settings.get_list(CLIENT_SECTION, "ip_services") {
            Ok(services) => client.ip_services = services,
            Err(Error::MissingOption { .. }) => {}
            Err(e) => return Err(e),
        }

        client.validate()?;
        Ok(client)
    }

    /// Validate the client settings
    pub fn validate(&self) -> Result<()> {
        match self.logging_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(Error::config(format!(
                    "Invalid logging level '{}'. Valid levels: trace, debug, info, warn, error",
                    self.logging_level
                )));
            }
        }

        if self.database.trim().is_empty() {
            return Err(Error::config("database path cannot be empty"));
        }

        let secs = self.http_timeout.as_secs();
        if !(1..=300).contains(&secs) {
            return Err(Error::config(format!(
                "http_timeout_secs must be between 1 and 300 seconds. Got: {}",
                secs
            )));
        }

        if self.ip_services.is_empty() {
            return Err(Error::config("ip_services must list at least one URL"));
        }

        for url in &self.ip_services {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "IP service URL must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        Ok(())
    }
}
