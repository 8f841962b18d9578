//! Router Configuration
//!
//! Manages all router settings including:
//! - Resolution defaults
//! - URI permission table sizing and persistence
//! - Logging

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{RDroidError, Result};

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Require DEFAULT on matching filters for the single-handler entry point
    pub default_only: bool,
    /// Log the verdict of every filter for every resolution
    pub log_resolution: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_only: true,
            log_resolution: false,
        }
    }
}

/// URI permission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Number of lock partitions in the grant table
    pub shard_count: usize,
    /// Honor prefix grants during checks
    pub prefix_grants_enabled: bool,
    /// Persisted grants kept per grantee before the oldest are released
    pub max_persisted_per_grantee: usize,
    /// Durable grant store location (defaults to the data directory)
    pub store_path: Option<PathBuf>,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            shard_count: num_cpus::get() * 4,
            prefix_grants_enabled: true,
            max_persisted_per_grantee: 128,
            store_path: None,
        }
    }
}

impl PermissionConfig {
    /// Shard count clamped to at least one partition
    pub fn effective_shard_count(&self) -> usize {
        self.shard_count.max(1)
    }

    /// Resolve the grant store path, falling back to the data directory
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| RouterConfig::data_dir().map(|dir| dir.join("uri_grants.json")))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Resolver settings
    pub resolver: ResolverConfig,
    /// URI permission settings
    pub permissions: PermissionConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            resolver: ResolverConfig::default(),
            permissions: PermissionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "rdroid", "R-Droid-Router")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("router.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "rdroid", "R-Droid-Router")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| RDroidError::Config("Cannot determine config path".into()))?;
        Self::load_from(&config_file).await
    }

    /// Load configuration from a file, creating it with defaults when missing
    pub async fn load_from(config_file: &Path) -> Result<Self> {
        if config_file.exists() {
            debug!("Loading config from {:?}", config_file);
            let contents = tokio::fs::read_to_string(config_file).await?;
            let config: RouterConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            info!("Config file not found, using defaults");
            let config = RouterConfig::default();
            config.save_to(config_file).await?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<()> {
        let config_file = Self::config_file()
            .ok_or_else(|| RDroidError::Config("Cannot determine config path".into()))?;
        self.save_to(&config_file).await
    }

    /// Save configuration to a file
    pub async fn save_to(&self, config_file: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(config_file, contents).await?;

        debug!("Config saved to {:?}", config_file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert!(config.resolver.default_only);
        assert!(config.permissions.prefix_grants_enabled);
        assert_eq!(config.permissions.max_persisted_per_grantee, 128);
        assert!(config.permissions.effective_shard_count() >= 1);
    }

    #[test]
    fn test_zero_shards_clamped() {
        let mut config = PermissionConfig::default();
        config.shard_count = 0;
        assert_eq!(config.effective_shard_count(), 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RouterConfig = toml::from_str("[permissions]\nprefix_grants_enabled = false\n").unwrap();
        assert!(!config.permissions.prefix_grants_enabled);
        assert_eq!(config.permissions.max_persisted_per_grantee, 128);
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn test_load_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("router.toml");

        let config = RouterConfig::load_from(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.version, 1);

        let mut changed = config.clone();
        changed.resolver.log_resolution = true;
        changed.save_to(&path).await.unwrap();

        let reloaded = RouterConfig::load_from(&path).await.unwrap();
        assert!(reloaded.resolver.log_resolution);
    }
}
