use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
    ServiceError, ServiceResult,
    match_record::{MatchId, MatchRecord, iso_millis, now_millis},
    repository::{ArcMatchRepository, RepoError},
    summary::{Summary, summarize},
    validation::{parse_replacement, validate_new_match},
};

pub const MATCH_NOT_FOUND_MESSAGE: &str = "Match not found";

/// Full export of the collection, as served by the backup endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Backup {
    #[serde(rename = "exportedAt", with = "iso_millis")]
    pub exported_at: DateTime<Utc>,
    pub matches: Vec<MatchRecord>,
}

#[async_trait::async_trait]
pub trait MatchService {
    async fn list_matches(&self) -> ServiceResult<Vec<MatchRecord>>;
    async fn export_backup(&self) -> ServiceResult<Backup>;
    async fn record_match(
        &self,
        date: Option<&str>,
        result: Option<&str>,
    ) -> ServiceResult<MatchRecord>;
    /// Replaces the whole collection. Returns the number of installed records.
    async fn replace_matches(&self, payload: &Value) -> ServiceResult<usize>;
    async fn delete_match(&self, id: &MatchId) -> ServiceResult<()>;
    async fn summary(&self) -> ServiceResult<Summary>;
}

pub type ArcMatchService = Arc<dyn MatchService + Send + Sync + 'static>;

pub struct MatchServiceImpl {
    repository: ArcMatchRepository,
}

impl MatchServiceImpl {
    pub fn new(repository: ArcMatchRepository) -> Self {
        Self { repository }
    }
}

fn storage_failure(action: &str, e: RepoError) -> ServiceError {
    log::error!("Failed to {}: {}", action, e);
    ServiceError::Internal(e.to_string())
}

#[async_trait::async_trait]
impl MatchService for MatchServiceImpl {
    async fn list_matches(&self) -> ServiceResult<Vec<MatchRecord>> {
        self.repository
            .list()
            .await
            .map_err(|e| storage_failure("list matches", e))
    }

    async fn export_backup(&self) -> ServiceResult<Backup> {
        let matches = self.list_matches().await?;
        Ok(Backup {
            exported_at: now_millis(),
            matches,
        })
    }

    async fn record_match(
        &self,
        date: Option<&str>,
        result: Option<&str>,
    ) -> ServiceResult<MatchRecord> {
        let (date, result) = validate_new_match(date, result)?;
        let record = MatchRecord::new(date, result);
        self.repository
            .append(&record)
            .await
            .map_err(|e| storage_failure("append match", e))?;
        log::debug!("Recorded {} on {} as {}", record.result, record.date, record.id);
        Ok(record)
    }

    async fn replace_matches(&self, payload: &Value) -> ServiceResult<usize> {
        let records = parse_replacement(payload)?;
        self.repository
            .replace_all(&records)
            .await
            .map_err(|e| storage_failure("replace matches", e))?;
        log::info!("Replaced match collection with {} records", records.len());
        Ok(records.len())
    }

    async fn delete_match(&self, id: &MatchId) -> ServiceResult<()> {
        let removed = self
            .repository
            .delete_by_id(id)
            .await
            .map_err(|e| storage_failure("delete match", e))?;
        if !removed {
            return ServiceError::not_found(MATCH_NOT_FOUND_MESSAGE);
        }
        log::debug!("Deleted match {}", id);
        Ok(())
    }

    async fn summary(&self) -> ServiceResult<Summary> {
        let matches = self.list_matches().await?;
        Ok(summarize(&matches))
    }
}
