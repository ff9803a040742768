//! Engine configuration loading and validation

use crate::engine::{CacheConfig, EngineConfig};
use crate::error::{AbacError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AbacConfig {
    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// 0 disables the background sweeper
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    #[serde(default)]
    pub store_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            capacity: default_capacity(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            store_timeout_ms: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_ttl() -> u64 { 300 }
fn default_capacity() -> usize { 10_000 }
fn default_sweep_interval() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AbacConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AbacConfig = toml::from_str(contents)
            .map_err(|e| AbacError::Config(format!("failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            return Err(AbacError::Config("cache.ttl_secs must be greater than zero".to_string()));
        }

        if self.cache.capacity == 0 {
            return Err(AbacError::Config("cache.capacity must be greater than zero".to_string()));
        }

        if self.engine.store_timeout_ms == Some(0) {
            return Err(AbacError::Config("engine.store_timeout_ms must be greater than zero".to_string()));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(AbacError::Config(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Cache settings
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.cache.capacity,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            sweep_interval: match self.cache.sweep_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    /// Engine settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            enable_metrics: self.engine.enable_metrics,
            store_timeout: self.engine.store_timeout_ms.map(Duration::from_millis),
        }
    }
}
