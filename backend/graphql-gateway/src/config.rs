//! Configuration for GraphQL Gateway
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! during local development.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Service endpoints
    pub services: ServiceEndpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace window for in-flight requests once shutdown starts
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub todo_service: String,
    /// Per-call deadline for Login
    pub login_timeout_ms: u64,
}

impl ServiceEndpoints {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: resolve_port(env::var("PORT").ok())?,
                shutdown_grace_secs: parse_var("SHUTDOWN_GRACE_SECS", 60)?,
            },
            services: ServiceEndpoints {
                todo_service: env::var("TODO_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:9090".to_string()),
                login_timeout_ms: parse_var("LOGIN_TIMEOUT_MS", 1000)?,
            },
        })
    }
}

/// Port from the raw `PORT` value; unset or empty falls back to 8080
pub fn resolve_port(raw: Option<String>) -> Result<u16, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var: "PORT",
            value: value.to_string(),
        }),
    }
}

fn parse_var(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value })
        }
        _ => Ok(default),
    }
}
