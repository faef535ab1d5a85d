use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use tracker_http_api::HttpConfig;
use tracker_persistence::StorageConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_PUBLIC_DIR: &str = "./public";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not valid: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub file_path: Option<PathBuf>,
    pub archive_pattern: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };
        let host_value = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host_value
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "HOST",
                value: host_value.clone(),
            })?;

        let storage = match var("DATABASE_URL") {
            Some(url) => StorageConfig::Database { url },
            None => StorageConfig::File {
                data_dir: PathBuf::from(var("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into())),
            },
        };

        let public_dir =
            PathBuf::from(var("PUBLIC_DIR").unwrap_or_else(|| DEFAULT_PUBLIC_DIR.into()));

        Ok(AppConfig {
            http: HttpConfig {
                addr: SocketAddr::new(host, port),
                public_dir,
            },
            storage,
            log: LogConfig {
                file_path: var("LOG_FILE_PATH").map(PathBuf::from),
                archive_pattern: var("LOG_ARCHIVE_PATTERN"),
            },
        })
    }
}
