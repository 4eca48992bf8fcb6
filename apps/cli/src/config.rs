//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH, TALLY_CATALOG_URL, TALLY_BLOB_ROOT,                 │
//! │     TALLY_BLOB_BASE_URL, TALLY_OUTPUT_DIR                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, else the platform config dir:                     │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.quotes/tally.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     database + blobs under the platform data dir                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//!
//! [catalog]
//! url = "https://sheets.example.com/export?format=csv"
//! timeout_secs = 15
//! cache_bust = true
//!
//! [blobs]
//! root = "/var/lib/tally/blobs"
//! public_base_url = "https://files.example.com"
//!
//! [documents]
//! output_dir = "./quotations"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading/validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tally", "quotes")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    data_dir().join("tally.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Catalog Settings
// =============================================================================

/// Where the bulk SKU sheet comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// CSV export URL. Required for `catalog refresh` and item entry.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,

    /// Appends `t=<unix millis>` so intermediate caches never serve a stale
    /// sheet.
    #[serde(default = "default_true")]
    pub cache_bust: bool,
}

fn default_catalog_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            url: None,
            timeout_secs: default_catalog_timeout(),
            cache_bust: true,
        }
    }
}

impl CatalogSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Blob Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobSettings {
    /// Directory holding `payment-images/`.
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,

    /// Prefix for minted image URLs. Defaults to `file://<root>`.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_blob_root() -> PathBuf {
    data_dir().join("blobs")
}

impl Default for BlobSettings {
    fn default() -> Self {
        BlobSettings {
            root: default_blob_root(),
            public_base_url: None,
        }
    }
}

impl BlobSettings {
    pub fn base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.root.display()))
    }
}

// =============================================================================
// Document Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DocumentSettings {
    fn default() -> Self {
        DocumentSettings {
            output_dir: default_output_dir(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub blobs: BlobSettings,

    #[serde(default)]
    pub documents: DocumentSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (an explicit path must exist; the default one may not)
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.catalog.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "Catalog URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.catalog.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "catalog.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("TALLY_CATALOG_URL") {
            debug!(url = %url, "Overriding catalog URL from environment");
            self.catalog.url = Some(url);
        }

        if let Ok(root) = std::env::var("TALLY_BLOB_ROOT") {
            self.blobs.root = PathBuf::from(root);
        }

        if let Ok(url) = std::env::var("TALLY_BLOB_BASE_URL") {
            self.blobs.public_base_url = Some(url);
        }

        if let Ok(dir) = std::env::var("TALLY_OUTPUT_DIR") {
            self.documents.output_dir = PathBuf::from(dir);
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.path.ends_with("tally.db"));
        assert_eq!(config.catalog.timeout_secs, 15);
        assert!(config.catalog.cache_bust);
        assert!(config.catalog.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [catalog]
            url = "https://sheets.example.com/export"

            [documents]
            output_dir = "/tmp/quotes"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog.url.as_deref(), Some("https://sheets.example.com/export"));
        assert_eq!(config.catalog.timeout_secs, 15);
        assert_eq!(config.documents.output_dir, PathBuf::from("/tmp/quotes"));
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.catalog.url = Some("ftp://nope".to_string());
        assert!(config.validate().is_err());

        config.catalog.url = Some("https://ok.example.com".to_string());
        assert!(config.validate().is_ok());

        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blob_base_url_defaults_to_file_url() {
        let mut blobs = BlobSettings {
            root: PathBuf::from("/srv/blobs"),
            public_base_url: None,
        };
        assert_eq!(blobs.base_url(), "file:///srv/blobs");

        blobs.public_base_url = Some("https://files.example.com".to_string());
        assert_eq!(blobs.base_url(), "https://files.example.com");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
