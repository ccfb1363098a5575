//! Configuration management for the cast server
//!
//! Separates startup configuration (requires restart) from runtime configuration
//! (can be updated via operator console commands).

use config::{Config, Environment, File};
use log::LevelFilter;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::channel::ChannelRegistry;
use crate::protocol::DATAGRAM_HEADER_LEN;
use crate::utils::logging::parse_level;

/// Complete server configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

/// Configuration that requires server restart to take effect
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    // ═══ NETWORK ═══
    /// Interface both sockets bind to
    pub bind_address: String,

    /// TCP control port; 0 picks an ephemeral port
    pub control_port: u16,

    /// UDP data port; 0 picks an ephemeral port
    pub data_port: u16,

    // ═══ REGISTRY / DATA PLANE ═══
    /// Number of channels, fixed for the life of the process
    pub channel_count: usize,

    /// Receive buffer size of the datagram router
    pub max_datagram_size: usize,

    /// Whether a broadcast skips its own sender
    pub exclude_sender: bool,
}

/// Configuration that can be updated at runtime via console commands
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Log verbosity: a level name or a numeric level 0-8
    /// Environment: CAST_LOG_LEVEL
    pub log_level: String,
}

/// Thread-safe runtime configuration wrapper
pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            startup: StartupConfig {
                bind_address: "0.0.0.0".to_string(),
                control_port: 1238,
                data_port: 1873,
                channel_count: ChannelRegistry::DEFAULT_CHANNEL_COUNT,
                max_datagram_size: 32768,
                exclude_sender: false,
            },
            runtime: RuntimeConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from ./config.toml (optional) with CAST_ environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the given file stem, falling back to defaults
    /// for every key the file and environment leave unset.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.startup.bind_address.as_str())?
            .set_default("control_port", i64::from(defaults.startup.control_port))?
            .set_default("data_port", i64::from(defaults.startup.data_port))?
            .set_default("channel_count", defaults.startup.channel_count as i64)?
            .set_default("max_datagram_size", defaults.startup.max_datagram_size as i64)?
            .set_default("exclude_sender", defaults.startup.exclude_sender)?
            .set_default("log_level", defaults.runtime.log_level.as_str())?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("CAST").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Split into startup (immutable) and runtime (mutable) parts
    pub fn split(self) -> (StartupConfig, SharedRuntimeConfig) {
        let runtime = Arc::new(RwLock::new(self.runtime));
        (self.startup, runtime)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.bind_address.is_empty() {
            return Err(config::ConfigError::Message(
                "bind_address cannot be empty".into(),
            ));
        }

        if self.startup.channel_count == 0 {
            return Err(config::ConfigError::Message(
                "channel_count must be greater than 0".into(),
            ));
        }

        if self.startup.max_datagram_size < DATAGRAM_HEADER_LEN {
            return Err(config::ConfigError::Message(format!(
                "max_datagram_size must be at least {DATAGRAM_HEADER_LEN} bytes"
            )));
        }

        if self.runtime.level_filter().is_none() {
            return Err(config::ConfigError::Message(format!(
                "Invalid log_level: {}",
                self.runtime.log_level
            )));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Get bind address and control port as socket address
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Get bind address and data port as socket address
    pub fn data_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.data_port)
    }
}

impl RuntimeConfig {
    /// Parsed log level, if valid
    pub fn level_filter(&self) -> Option<LevelFilter> {
        parse_level(&self.log_level)
    }
}
