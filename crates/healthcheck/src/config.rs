//! Pool configuration: model, defaults, JSON loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Attributes shared by every pool kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CommonPool {
    /// Pool name, unique across the whole config
    #[validate(length(min = 1))]
    pub name: String,

    /// Service port probed on every member
    #[validate(range(min = 1))]
    pub port: u16,

    /// Member hosts, either IP addresses or DNS names
    #[validate(length(min = 1))]
    pub members: Vec<String>,

    /// Address published for a member until its host first resolves
    pub fallback_ip: IpAddr,

    /// Seconds between probes of one member
    #[validate(range(min = 1))]
    pub interval: u64,

    /// Consecutive failures required before a member is published as down
    #[validate(range(min = 1))]
    pub failure_threshold: u32,
}

/// Pool checked with a bare TCP connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TcpPool {
    #[serde(flatten)]
    #[validate]
    pub common: CommonPool,
}

/// Pool checked with an HTTP GET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HttpPool {
    #[serde(flatten)]
    #[validate]
    pub common: CommonPool,

    /// Request path, must begin with '/'
    #[validate(custom = "validate_send_path")]
    pub send: String,

    /// Host header value to send. Empty string indicates no host header
    pub host_header: String,

    /// Probe over https instead of http
    pub https_enabled: bool,

    /// Require a valid certificate chain when probing over https
    pub https_require_validity: bool,

    /// String to look for in the response body. Empty string indicates no
    /// body checking
    pub receive_up_string: String,

    /// Status codes that mark the member up. A match on these supersedes any
    /// body checking
    #[validate(custom = "validate_up_codes")]
    pub receive_up_codes: Vec<u16>,
}

/// Top level configuration for health check pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http_pools: Vec<HttpPool>,

    #[serde(default)]
    pub tcp_pools: Vec<TcpPool>,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        for pool in &self.http_pools {
            pool.validate()?;
        }
        for pool in &self.tcp_pools {
            pool.validate()?;
        }

        let mut seen = HashSet::new();
        let names = self
            .http_pools
            .iter()
            .map(|p| &p.common.name)
            .chain(self.tcp_pools.iter().map(|p| &p.common.name));
        for name in names {
            if !seen.insert(name.as_str()) {
                let mut errors = ValidationErrors::new();
                errors.add("name", ValidationError::new("duplicate_pool_name"));
                return Err(errors);
            }
        }

        Ok(())
    }
}

impl Default for Config {
    /// Deterministic built-in config used when no file is supplied: one TCP
    /// pool and one HTTP pool pointing at localhost.
    fn default() -> Self {
        let common = CommonPool {
            name: "tcp-default".to_string(),
            port: 443,
            members: vec!["127.0.0.1".to_string()],
            fallback_ip: IpAddr::from([127, 0, 0, 1]),
            interval: 10,
            failure_threshold: 3,
        };

        let tcp_pool = TcpPool {
            common: common.clone(),
        };

        let http_pool = HttpPool {
            common: CommonPool {
                name: "http-default".to_string(),
                ..common
            },
            send: "/health".to_string(),
            host_header: "localhost".to_string(),
            https_enabled: false,
            https_require_validity: false,
            receive_up_string: String::new(),
            receive_up_codes: vec![200, 201],
        };

        Self {
            http_pools: vec![http_pool],
            tcp_pools: vec![tcp_pool],
        }
    }
}

impl Config {
    /// Load and validate a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

// Custom validators

fn validate_send_path(send: &str) -> Result<(), ValidationError> {
    if !send.starts_with('/') {
        return Err(ValidationError::new("send_path_must_start_with_slash"));
    }
    Ok(())
}

fn validate_up_codes(codes: &[u16]) -> Result<(), ValidationError> {
    if codes.iter().any(|c| !(100..=599).contains(c)) {
        return Err(ValidationError::new("invalid_http_status_code"));
    }
    Ok(())
}
