use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{IfcGraphError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Resolver tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Store fetches allowed in flight within one resolver call.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fetch_concurrency() -> usize {
    8
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in IFCGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("IFCGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Parse and validate the TOML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            IfcGraphError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)
            .map_err(|e| IfcGraphError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.store.db_path.as_os_str().is_empty() {
            return Err(IfcGraphError::Config("store.db_path must not be empty".to_string()));
        }

        if self.resolver.fetch_concurrency == 0 {
            return Err(IfcGraphError::Config(
                "resolver.fetch_concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }
}
