use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const ENABLE_HTTPS_ENV: &str = "ENABLE_HTTPS";
pub const CONFIG_ENV: &str = "CONFIG";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const TRUSTED_SUBNET_ENV: &str = "TRUSTED_SUBNET";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Command line of the `burrow` server.
///
/// Every setting except the log format is optional here: values missing
/// from both the flags and the environment are taken from the JSON config
/// file, then from built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "burrow", about = "URL shortener HTTP server")]
pub struct CLI {
    /// Address to listen on, e.g. `localhost:8080`.
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV)]
    pub server_address: Option<String>,

    /// Base prepended to keys in returned short URLs.
    #[arg(short = 'b', long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Append-only log used by the file backend.
    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    /// PostgreSQL connection string. Without it the file backend is used.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(
        short = 's',
        long,
        env = ENABLE_HTTPS_ENV,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub enable_https: Option<bool>,

    /// CIDR allowed to read `/api/internal/stats`, matched against `X-Real-IP`.
    #[arg(short = 't', long, env = TRUSTED_SUBNET_ENV)]
    pub trusted_subnet: Option<String>,

    /// JSON config file.
    #[arg(short = 'c', long = "config", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum)]
    pub log_format: Option<LogFormat>,
}
