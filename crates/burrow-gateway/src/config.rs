use crate::cli::{LogFormat, CLI};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_STORAGE_PATH: &str = "short_url_storage.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Settings read from the JSON config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub server_address: Option<String>,
    pub base_url: Option<String>,
    pub file_storage_path: Option<PathBuf>,
    pub database_dsn: Option<String>,
    pub enable_https: Option<bool>,
    pub trusted_subnet: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_address: String,
    pub base_url: String,
    pub file_storage_path: PathBuf,
    /// `None` selects the file backend.
    pub database_dsn: Option<String>,
    /// TLS is terminated in front of the server; the flag is only reported.
    pub enable_https: bool,
    /// CIDR for the internal endpoints; `None` closes them.
    pub trusted_subnet: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    /// Flags and environment (already merged by clap) win over the config
    /// file, which wins over the defaults.
    pub fn resolve(cli: &CLI) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    fn merge(cli: &CLI, file: FileConfig) -> Self {
        Self {
            server_address: cli
                .server_address
                .clone()
                .or(file.server_address)
                .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
            base_url: cli
                .base_url
                .clone()
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            file_storage_path: cli
                .file_storage_path
                .clone()
                .or(file.file_storage_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_STORAGE_PATH)),
            database_dsn: cli
                .database_dsn
                .clone()
                .or(file.database_dsn)
                .filter(|dsn| !dsn.trim().is_empty()),
            enable_https: cli.enable_https.or(file.enable_https).unwrap_or(false),
            trusted_subnet: cli
                .trusted_subnet
                .clone()
                .or(file.trusted_subnet)
                .filter(|subnet| !subnet.trim().is_empty()),
            log_format: cli.log_format.unwrap_or(LogFormat::Text),
        }
    }
}
