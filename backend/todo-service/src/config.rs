//! Configuration management for Todo Service
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! during local development.
//!
//! # Example
//!
//! ```no_run
//! use todo_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("gRPC port: {}", settings.server.port);
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
}

impl Settings {
    /// Load settings from environment variables (and `.env` when present)
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Settings {
            server: ServerSettings::from_env()?,
        })
    }
}

/// gRPC listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub enable_reflection: bool,
    pub keepalive_interval_secs: u64,
    pub keepalive_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            enable_reflection: true,
            keepalive_interval_secs: 60,
            keepalive_timeout_secs: 20,
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("GRPC_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("GRPC_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .context("Invalid GRPC_PORT")?,
            enable_reflection: env::var("GRPC_ENABLE_REFLECTION")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("Invalid GRPC_ENABLE_REFLECTION")?,
            keepalive_interval_secs: env::var("GRPC_KEEPALIVE_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid GRPC_KEEPALIVE_INTERVAL_SECS")?,
            keepalive_timeout_secs: env::var("GRPC_KEEPALIVE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Invalid GRPC_KEEPALIVE_TIMEOUT_SECS")?,
        })
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_timeout_secs)
    }
}
