use std::{path::PathBuf, sync::Arc};

use tracker_domain::repository::{ArcMatchRepository, RepoError, RepoResult};

use crate::{
    file::FileMatchRepository, postgres::PostgresMatchRepository, sqlite::SqliteMatchRepository,
};

pub mod file;
pub mod postgres;
pub mod sqlite;

/// Which backend to open, decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    File { data_dir: PathBuf },
    Database { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgres,
    Sqlite,
}

impl DatabaseKind {
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(DatabaseKind::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(DatabaseKind::Sqlite)
        } else {
            None
        }
    }
}

impl StorageConfig {
    pub fn describe(&self) -> &'static str {
        match self {
            StorageConfig::File { .. } => "file",
            StorageConfig::Database { url } => match DatabaseKind::from_url(url) {
                Some(DatabaseKind::Postgres) => "PostgreSQL",
                Some(DatabaseKind::Sqlite) => "SQLite",
                None => "unknown database",
            },
        }
    }
}

/// Opens and initializes the configured backend. The returned repository is
/// ready to serve traffic.
pub async fn open_repository(config: &StorageConfig) -> RepoResult<ArcMatchRepository> {
    let repository: ArcMatchRepository = match config {
        StorageConfig::File { data_dir } => Arc::new(FileMatchRepository::open(data_dir).await?),
        StorageConfig::Database { url } => match DatabaseKind::from_url(url) {
            Some(DatabaseKind::Postgres) => Arc::new(PostgresMatchRepository::connect(url).await?),
            Some(DatabaseKind::Sqlite) => Arc::new(SqliteMatchRepository::connect(url).await?),
            None => {
                // only the scheme, the rest may carry credentials
                let scheme = url.split(':').next().unwrap_or_default();
                return Err(RepoError::StorageError(format!(
                    "unsupported DATABASE_URL scheme: {}",
                    scheme
                )));
            }
        },
    };
    Ok(repository)
}
