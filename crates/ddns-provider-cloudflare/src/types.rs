//! Cloudflare API v4 wire types

use serde::{Deserialize, Serialize};

/// Envelope wrapping every Cloudflare API response
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    pub errors: Option<Vec<CloudflareError>>,
}

impl<T> CloudflareResponse<T> {
    /// All error messages in the envelope, joined
    pub fn error_message(&self) -> String {
        let messages: Vec<String> = self
            .errors
            .iter()
            .flatten()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect();

        if messages.is_empty() {
            "Unknown error".to_string()
        } else {
            messages.join("; ")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareError {
    pub code: i64,
    pub message: String,
}

/// DNS record as returned by list and update calls
#[derive(Debug, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Body of `PATCH /zones/{zone}/dns_records/{id}`
#[derive(Debug, Serialize)]
pub struct UpdateDnsRecord<'a> {
    pub content: String,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub ttl: u32,
    pub proxied: bool,
    pub comment: String,
}
