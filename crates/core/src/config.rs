//! Configuration management
//!
//! This module handles loading, saving, and migrating the mys3 configuration
//! file. The configuration file is stored in TOML format at
//! ~/.config/mys3browser/config.toml, or under `$MYS3_CONFIG_DIR` when set.
//!
//! Credentials are not kept here; they live in the credential storage files
//! inside the data directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::DEFAULT_DOWNLOAD_EXPIRY;

/// Current configuration schema version
///
/// Bumping this version requires a migration step in `ConfigManager::migrate`.
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MYS3_CONFIG_DIR";

/// Directory name under the platform config directory
const APP_DIR: &str = "mys3browser";

/// Default output format
const DEFAULT_OUTPUT: &str = "human";

/// Default color setting
const DEFAULT_COLOR: &str = "auto";

/// Longest lifetime S3 accepts for a presigned URL (7 days)
const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Browsing behavior
    #[serde(default)]
    pub browse: BrowseConfig,

    /// Where credential storage lives
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress bars
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Browsing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    /// Lifetime of presigned download URLs in seconds
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_secs: u64,
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for credential storage; defaults to the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_presign_expiry() -> u64 {
    DEFAULT_DOWNLOAD_EXPIRY.as_secs()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            presign_expiry_secs: default_presign_expiry(),
        }
    }
}

impl BrowseConfig {
    /// Presigned URL lifetime
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            browse: BrowseConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Keys accepted by [`Config::set`]
    pub const KEYS: &'static [&'static str] = &[
        "defaults.output",
        "defaults.color",
        "defaults.progress",
        "browse.presign_expiry_secs",
        "storage.data_dir",
    ];

    /// Set one value by its dotted key
    ///
    /// An empty `storage.data_dir` clears the override.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "defaults.output" => {
                self.defaults.output = one_of(key, value, &["human", "json"])?;
            }
            "defaults.color" => {
                self.defaults.color = one_of(key, value, &["auto", "always", "never"])?;
            }
            "defaults.progress" => {
                self.defaults.progress = value.parse().map_err(|_| {
                    Error::Config(format!("{key} must be true or false, got '{value}'"))
                })?;
            }
            "browse.presign_expiry_secs" => {
                self.browse.presign_expiry_secs = value.parse().map_err(|_| {
                    Error::Config(format!("{key} must be a number of seconds, got '{value}'"))
                })?;
            }
            "storage.data_dir" => {
                self.storage.data_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            _ => {
                return Err(Error::Config(format!(
                    "Unknown key '{key}'; expected one of: {}",
                    Self::KEYS.join(", ")
                )));
            }
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        let expiry = self.browse.presign_expiry_secs;
        if expiry == 0 || expiry > MAX_PRESIGN_EXPIRY_SECS {
            return Err(Error::Config(format!(
                "browse.presign_expiry_secs must be between 1 and {MAX_PRESIGN_EXPIRY_SECS}, got {expiry}"
            )));
        }
        Ok(())
    }
}

fn one_of(key: &str, value: &str, allowed: &[&str]) -> Result<String> {
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(Error::Config(format!(
            "{key} must be one of {}, got '{value}'",
            allowed.join(", ")
        )))
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join(APP_DIR),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Directory holding the configuration file
    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Directory for credential storage under the given config
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        config
            .storage
            .data_dir
            .clone()
            .unwrap_or_else(|| self.config_dir().to_path_buf())
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade mys3.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::info!(
            "Migrating configuration from schema {} to {}",
            config.schema_version,
            SCHEMA_VERSION
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.output, "human");
        assert_eq!(config.defaults.color, "auto");
        assert!(config.defaults.progress);
        assert_eq!(config.browse.presign_expiry(), Duration::from_secs(3600));
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.browse.presign_expiry_secs = 600;
        config.storage.data_dir = Some(temp_dir.path().join("data"));

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.browse.presign_expiry_secs, 600);
        assert_eq!(manager.data_dir(&loaded), temp_dir.path().join("data"));
    }

    #[test]
    fn test_set_known_keys() {
        let mut config = Config::default();
        config.set("defaults.output", "json").unwrap();
        config.set("defaults.progress", "false").unwrap();
        config.set("browse.presign_expiry_secs", "900").unwrap();
        config.set("storage.data_dir", "/tmp/mys3").unwrap();

        assert_eq!(config.defaults.output, "json");
        assert!(!config.defaults.progress);
        assert_eq!(config.browse.presign_expiry(), Duration::from_secs(900));
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/mys3")));

        config.set("storage.data_dir", "").unwrap();
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(matches!(config.set("defaults.color", "purple"), Err(Error::Config(_))));
        assert!(matches!(config.set("defaults.progress", "yes"), Err(Error::Config(_))));
        assert!(matches!(config.set("browse.presign_expiry_secs", "0"), Err(Error::Config(_))));
        assert!(matches!(config.set("nope", "1"), Err(Error::Config(_))));
    }

    #[test]
    fn test_data_dir_defaults_to_config_dir() {
        let (manager, temp_dir) = temp_config_manager();
        assert_eq!(manager.data_dir(&Config::default()), temp_dir.path());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            "schema_version = 1\n[defaults]\noutput = \"json\"\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.defaults.output, "json");
        assert!(config.defaults.progress);
        assert_eq!(config.browse.presign_expiry_secs, 3600);
    }

    #[test]
    fn test_invalid_expiry_rejected() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            "schema_version = 1\n[browse]\npresign_expiry_secs = 0\n",
        )
        .unwrap();

        assert!(matches!(manager.load(), Err(Error::Config(_))));
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!(
            r#"
            schema_version = {}
            "#,
            SCHEMA_VERSION + 1
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("newer than supported"));
    }
}
