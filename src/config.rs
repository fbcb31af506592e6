//! Process-start-time configuration (§6, §10).
//!
//! Loaded once from the environment before the listener binds. Building the
//! argv/CLI surface on top of this is explicitly out of scope (§1); reading
//! from environment variables is this module's entire job.

use std::collections::HashSet;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Production,
    Development,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub address: SocketAddr,
    pub env: Environment,
    pub origins: OriginPolicy,
}

/// The allowed-origin set for WebSocket upgrades.
///
/// An empty set defers to the library default (same-origin-ish relaxed
/// checking); a set containing exactly `"*"` allows any origin.
#[derive(Debug, Clone)]
pub enum OriginPolicy {
    LibraryDefault,
    Any,
    Allowlist(HashSet<String>),
}

impl OriginPolicy {
    pub fn from_list(origins: &[String]) -> Self {
        if origins.is_empty() {
            OriginPolicy::LibraryDefault
        } else if origins.len() == 1 && origins[0] == "*" {
            OriginPolicy::Any
        } else {
            OriginPolicy::Allowlist(origins.iter().cloned().collect())
        }
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        match self {
            OriginPolicy::LibraryDefault => true,
            OriginPolicy::Any => true,
            OriginPolicy::Allowlist(set) => origin.map(|o| set.contains(o)).unwrap_or(false),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid listener address {0:?}: {1}")]
    InvalidAddress(String, std::net::AddrParseError),
}

impl Config {
    /// Loads configuration from the environment, applying §6's defaults.
    ///
    /// - `ADDRESS` (default `0.0.0.0:8080`)
    /// - `ENV` (`production` | `development`, default `production`)
    /// - `ORIGINS` (comma-separated, default empty)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_address = std::env::var("ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let address = parse_address(&raw_address)?;

        let env = match std::env::var("ENV").unwrap_or_else(|_| "production".to_string()).as_str() {
            "development" => Environment::Development,
            _ => Environment::Production,
        };

        let origins: Vec<String> = std::env::var("ORIGINS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            address,
            env,
            origins: OriginPolicy::from_list(&origins),
        })
    }
}

fn parse_address(raw: &str) -> Result<SocketAddr, ConfigError> {
    // Accept the Go-style ":8080" shorthand in addition to a full socket address.
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    };
    candidate
        .parse()
        .map_err(|e| ConfigError::InvalidAddress(raw.to_string(), e))
}
