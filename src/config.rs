// src/config.rs
//! Runtime settings loaded from the environment (and `.env` via `dotenv`).
//!
//! Every required variable is checked up front; missing and invalid ones are
//! reported together so a misconfigured deployment fails once with the full list.

use config::{Config, Environment};
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8888";
pub const DEFAULT_STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// A string that never shows up in logs or `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{}", describe(.missing, .invalid))]
    Invalid {
        missing: Vec<&'static str>,
        invalid: Vec<String>,
    },
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

fn describe(missing: &[&'static str], invalid: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing env vars: {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!("Invalid env vars: {}", invalid.join("; ")));
    }
    parts.join(". ")
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub strava_client_id: String,
    pub strava_client_secret: Secret,
    pub frontend_url: String,
    /// Absent means `/sign` answers 500 while `/auth` keeps working.
    pub signer_private_key: Option<Secret>,
    pub bind_addr: SocketAddr,
    pub strava_api_base: String,
    pub strava_token_url: String,
    /// Key rate limits on `X-Forwarded-For` instead of the socket address.
    pub trust_proxy_headers: bool,
}

impl Settings {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, SettingsError> {
        let source = Config::builder().add_source(Environment::default()).build()?;
        Self::from_config(&source)
    }

    /// Keys are the lowercased variable names, e.g. `strava_client_id`.
    pub fn from_config(source: &Config) -> Result<Self, SettingsError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let mut required = |key: &str, name: &'static str| match lookup(source, key) {
            Some(value) => value,
            None => {
                missing.push(name);
                String::new()
            }
        };
        let strava_client_id = required("strava_client_id", "STRAVA_CLIENT_ID");
        let strava_client_secret = required("strava_client_secret", "STRAVA_CLIENT_SECRET");
        let frontend_url = required("frontend_url", "FRONTEND_URL");

        if !frontend_url.is_empty() && !frontend_url.starts_with("http") {
            invalid.push("FRONTEND_URL must be a valid URL".to_string());
        }

        let signer_private_key = lookup(source, "signer_private_key");
        if let Some(key) = &signer_private_key {
            if !key.starts_with("0x") {
                invalid.push("SIGNER_PRIVATE_KEY must start with 0x".to_string());
            }
            if key.len() != 66 {
                invalid.push("SIGNER_PRIVATE_KEY must be 66 characters (0x + 64 hex chars)".to_string());
            }
        }

        let bind_addr = lookup(source, "bind_addr").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = match bind_addr.parse::<SocketAddr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                invalid.push(format!("BIND_ADDR is not a socket address: {bind_addr}"));
                None
            }
        };

        let trust_proxy_headers = match lookup(source, "trust_proxy_headers") {
            None => false,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    invalid.push("TRUST_PROXY_HEADERS must be true or false".to_string());
                    false
                }
            },
        };

        let (Some(bind_addr), true, true) = (bind_addr, missing.is_empty(), invalid.is_empty()) else {
            return Err(SettingsError::Invalid { missing, invalid });
        };

        Ok(Self {
            strava_client_id,
            strava_client_secret: Secret::new(strava_client_secret),
            frontend_url,
            signer_private_key: signer_private_key.map(Secret::new),
            bind_addr,
            strava_api_base: lookup(source, "strava_api_base")
                .unwrap_or_else(|| DEFAULT_STRAVA_API_BASE.to_string()),
            strava_token_url: lookup(source, "strava_token_url")
                .unwrap_or_else(|| DEFAULT_STRAVA_TOKEN_URL.to_string()),
            trust_proxy_headers,
        })
    }
}

/// Empty values count as unset.
fn lookup(source: &Config, key: &str) -> Option<String> {
    source
        .get_string(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
