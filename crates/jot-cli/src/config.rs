//! CLI configuration file
//!
//! Read from `--config`, or from `jot/config.toml` under the platform
//! config directory. A missing default file means all defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use jot_logging::LogConfig;
use jot_sync::{HttpRemoteConfig, SyncConfig};

/// Environment variable that overrides the configured access token
pub const ACCESS_TOKEN_ENV: &str = "JOT_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Where the note cache lives; defaults to the platform data directory
    pub data_dir: Option<PathBuf>,
    /// Signed-in user id; without one, notes stay on this device
    pub user: Option<String>,
    /// Hosted backend; without one, the CLI works offline
    pub remote: Option<RemoteSection>,
    /// Logging; defaults to warnings on stderr
    pub log: Option<LogConfig>,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl RemoteSection {
    /// Build the HTTP client settings; `token_override` wins over the file
    pub fn http_config(&self, token_override: Option<String>) -> HttpRemoteConfig {
        let mut config = HttpRemoteConfig::new(&self.url, &self.api_key)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(token) = token_override.or_else(|| self.access_token.clone()) {
            config = config.with_access_token(token);
        }
        if let Some(table) = &self.table {
            config = config.with_table(table);
        }
        config
    }
}

impl CliConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("jot").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("jot")
        })
    }
}
