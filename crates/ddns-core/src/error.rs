//! Error types for the DDNS updater
//!
//! Every fallible operation in the workspace returns [`Error`]. Provider
//! crates translate HTTP and transport failures into it explicitly at each
//! call site (see [`Error::from_status`] and [`Error::network`]).

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing settings (credentials, zone, record name)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A configuration option was requested but is not present
    #[error("Option '{option}' not found in section '{section}'")]
    MissingOption {
        /// Section name
        section: String,
        /// Option name
        option: String,
    },

    /// A record for this domain already exists in the record store
    #[error("Record already exists: {service}/{domain_name}")]
    DuplicateRecord {
        /// Provider the insert was attempted for
        service: String,
        /// Domain that already has a record
        domain_name: String,
    },

    /// No record matched the lookup
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Transport failure (connect, timeout, DNS resolution)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with an error status or error envelope
    #[error("Remote API error ({provider}, status {status:?}): {message}")]
    RemoteApi {
        /// Provider name
        provider: String,
        /// HTTP status, when the failure came from a status code
        status: Option<u16>,
        /// Provider message
        message: String,
    },

    /// Provider rejected the request with a rate limit (HTTP 429)
    #[error("Rate limited by {provider}: {message}")]
    RateLimited {
        /// Provider name
        provider: String,
        /// Provider message
        message: String,
    },

    /// Record store failures (database errors)
    #[error("Record store error: {0}")]
    StateStore(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a missing option error
    pub fn missing_option(section: impl Into<String>, option: impl Into<String>) -> Self {
        Self::MissingOption {
            section: section.into(),
            option: option.into(),
        }
    }

    /// Create a duplicate record error
    pub fn duplicate(service: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self::DuplicateRecord {
            service: service.into(),
            domain_name: domain_name.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::RecordNotFound(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a remote API error that did not come from an HTTP status
    pub fn remote(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a record store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Map a non-success HTTP status from a provider to an error
    ///
    /// 429 becomes [`Error::RateLimited`]; everything else becomes
    /// [`Error::RemoteApi`] carrying the status and the response body.
    pub fn from_status(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let provider = provider.into();
        let body = body.into();
        match status {
            429 => Self::RateLimited {
                provider,
                message: if body.is_empty() {
                    "Too many requests".to_string()
                } else {
                    body
                },
            },
            _ => Self::RemoteApi {
                provider,
                status: Some(status),
                message: body,
            },
        }
    }

    /// Whether a caller-side retry policy may reasonably retry this error
    ///
    /// The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited { .. } => true,
            Self::RemoteApi {
                status: Some(status),
                ..
            } => (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::StateStore(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limited() {
        let err = Error::from_status("cloudflare", 429, "");
        assert!(matches!(err, Error::RateLimited { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_status_mapping_keeps_context() {
        let err = Error::from_status("cloudflare", 403, "Authentication error");
        match &err {
            Error::RemoteApi {
                provider,
                status,
                message,
            } => {
                assert_eq!(provider, "cloudflare");
                assert_eq!(*status, Some(403));
                assert_eq!(message, "Authentication error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_retryable());
        assert!(Error::from_status("duckdns", 502, "bad gateway").is_retryable());
    }

    #[test]
    fn test_missing_option_message() {
        let err = Error::missing_option("cloudflare", "zone_id");
        assert_eq!(
            err.to_string(),
            "Option 'zone_id' not found in section 'cloudflare'"
        );
    }
}
