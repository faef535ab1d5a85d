use std::sync::Arc;

use thiserror::Error;

use crate::match_record::{MatchId, MatchRecord};

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("storage error: {0}")]
    StorageError(String),
}

impl RepoError {
    pub fn storage<E: std::fmt::Display>(e: E) -> Self {
        RepoError::StorageError(e.to_string())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Durable storage for match records. Exactly one implementation is active
/// for the lifetime of the process.
#[async_trait::async_trait]
pub trait MatchRepository {
    /// All records, oldest `created_at` first.
    async fn list(&self) -> RepoResult<Vec<MatchRecord>>;
    async fn append(&self, record: &MatchRecord) -> RepoResult<()>;
    /// Returns whether a record with this id existed.
    async fn delete_by_id(&self, id: &MatchId) -> RepoResult<bool>;
    /// Discards every stored record and installs `records` in one step.
    async fn replace_all(&self, records: &[MatchRecord]) -> RepoResult<()>;
}

pub type ArcMatchRepository = Arc<dyn MatchRepository + Send + Sync + 'static>;

#[cfg(test)]
pub use mock::MockMatchRepository;
