//! # Configuration
//!
//! `tally.toml`, loaded with serde. Every field has a default, so an empty
//! or partial file is valid. Command line flags override file values.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 5000
//!
//! [storage]
//! backend = "redb"
//! database = "tally.redb"
//!
//! [history]
//! url = "http://127.0.0.1:5000"
//! api_key = "secret"
//! limit = 50
//!
//! [ui]
//! theme = "dark"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tally_core::{BackendKind, CalcError, Theme, primitives::DEFAULT_HISTORY_LIMIT};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Local history store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            database: PathBuf::from("tally.redb"),
        }
    }
}

/// Remote history service settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Base URL of a history service; local storage is used when absent.
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Default number of entries for history listings.
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Presentation settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
}

/// Application configuration loaded from TOML.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub history: HistoryConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load a configuration from a TOML file on disk.
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, CalcError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CalcError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, CalcError> {
        toml::from_str(raw).map_err(|e| CalcError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Load `explicit` if given, else `tally.toml` if it exists, else defaults.
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CalcError> {
        match explicit {
            Some(path) => Self::from_toml_path(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!("loading {}", DEFAULT_CONFIG_FILE);
                    Self::from_toml_path(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.backend, BackendKind::Redb);
        assert_eq!(config.history.limit, 50);
        assert_eq!(config.ui.theme, Theme::Light);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [ui]
            theme = "dark"
            "#,
        )
        .expect("parse");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ui.theme, Theme::Dark);
        assert!(config.history.url.is_none());
    }

    #[test]
    fn full_file() {
        let config = AppConfig::from_toml_str(
            r#"
            [storage]
            backend = "memory"
            database = "/tmp/h.redb"

            [history]
            url = "http://127.0.0.1:5000"
            api_key = "k"
            limit = 10
            "#,
        )
        .expect("parse");
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.storage.database, PathBuf::from("/tmp/h.redb"));
        assert_eq!(config.history.url.as_deref(), Some("http://127.0.0.1:5000"));
        assert_eq!(config.history.api_key.as_deref(), Some("k"));
        assert_eq!(config.history.limit, 10);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("[ui]\ntheme = \"sepia\""),
            Err(CalcError::SerializationError(_))
        ));
        assert!(AppConfig::from_toml_str("[server]\nport = \"x\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(CalcError::IoError(_))
        ));
    }

    #[test]
    fn loads_from_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("tally.toml");
        std::fs::write(&path, "[history]\nlimit = 7\n").expect("write");
        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.history.limit, 7);
    }
}
