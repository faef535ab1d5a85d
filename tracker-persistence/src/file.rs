use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::{fs, sync::Mutex};
use tracker_domain::{
    match_record::{MatchId, MatchRecord},
    repository::{MatchRepository, RepoError, RepoResult},
};

pub const MATCHES_FILE_NAME: &str = "matches.json";

/// Stores the whole collection as one pretty-printed JSON array.
///
/// Every mutation rewrites the file. Writers inside this process are
/// serialized by `write_lock`; other processes writing the same file are not
/// coordinated with.
pub struct FileMatchRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMatchRepository {
    pub async fn open(data_dir: impl AsRef<Path>) -> RepoResult<Self> {
        let repo = Self {
            path: data_dir.as_ref().join(MATCHES_FILE_NAME),
            write_lock: Mutex::new(()),
        };
        repo.ensure_store().await?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_store(&self) -> RepoResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await.map_err(RepoError::storage)?;
        }
        if !fs::try_exists(&self.path).await.map_err(RepoError::storage)? {
            fs::write(&self.path, "[]").await.map_err(RepoError::storage)?;
            log::info!("Created empty match store at {}", self.path.display());
        }
        Ok(())
    }

    async fn load(&self) -> RepoResult<Vec<MatchRecord>> {
        self.ensure_store().await?;
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(RepoError::storage)?;
        let elements = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(elements) => elements,
            Err(e) => {
                log::warn!(
                    "Match store {} is unreadable, treating it as empty: {}",
                    self.path.display(),
                    e
                );
                return Ok(Vec::new());
            }
        };

        // a bad element fails the read so no writer persists a partial list
        elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                serde_json::from_value::<MatchRecord>(element).map_err(|e| {
                    RepoError::StorageError(format!(
                        "undecodable record at index {} in {}: {}",
                        index,
                        self.path.display(),
                        e
                    ))
                })
            })
            .collect()
    }

    async fn save(&self, records: &[MatchRecord]) -> RepoResult<()> {
        let json = serde_json::to_string_pretty(records).map_err(RepoError::storage)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .map_err(RepoError::storage)?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(RepoError::storage)
    }
}

#[async_trait::async_trait]
impl MatchRepository for FileMatchRepository {
    async fn list(&self) -> RepoResult<Vec<MatchRecord>> {
        let mut records = self.load().await?;
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn append(&self, record: &MatchRecord) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.push(record.clone());
        self.save(&records).await
    }

    async fn delete_by_id(&self, id: &MatchId) -> RepoResult<bool> {
        let _guard = self.write_lock.lock().await;
        let records = self.load().await?;
        let before = records.len();
        let remaining: Vec<MatchRecord> = records.into_iter().filter(|r| &r.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.save(&remaining).await?;
        Ok(true)
    }

    async fn replace_all(&self, records: &[MatchRecord]) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save(records).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracker_domain::match_record::{MatchResult, parse_timestamp};

    use super::*;

    fn record(id: &str, date: &str, result: MatchResult, created_at: &str) -> MatchRecord {
        MatchRecord {
            id: MatchId(id.to_string()),
            date: date.parse().unwrap(),
            result,
            created_at: parse_timestamp(created_at).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let repo = FileMatchRepository::open(&data_dir).await.unwrap();

        assert_eq!(std::fs::read_to_string(repo.path()).unwrap(), "[]");
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();
        repo.append(&record(
            "a",
            "2024-01-01",
            MatchResult::Win,
            "2024-01-01T10:00:00Z",
        ))
        .await
        .unwrap();

        let reopened = FileMatchRepository::open(dir.path()).await.unwrap();
        assert_eq!(reopened.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_and_list_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();
        let late = record("late", "2024-01-01", MatchResult::Win, "2024-01-02T00:00:00Z");
        let early = record("early", "2024-01-05", MatchResult::Loss, "2024-01-01T00:00:00Z");
        repo.append(&late).await.unwrap();
        repo.append(&early).await.unwrap();

        assert_eq!(repo.list().await.unwrap(), vec![early, late]);

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        assert!(raw.contains("\n  {"), "store should be pretty-printed");
        assert!(raw.contains("\"createdAt\": \"2024-01-02T00:00:00.000Z\""));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();
        let a = record("a", "2024-01-01", MatchResult::Win, "2024-01-01T00:00:00Z");
        let b = record("b", "2024-01-01", MatchResult::Loss, "2024-01-01T00:00:01Z");
        repo.append(&a).await.unwrap();
        repo.append(&b).await.unwrap();

        assert!(!repo.delete_by_id(&MatchId("zzz".to_string())).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 2);

        assert!(repo.delete_by_id(&a.id).await.unwrap());
        assert_eq!(repo.list().await.unwrap(), vec![b]);
        assert!(!repo.delete_by_id(&a.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_all_discards_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();
        repo.append(&record("old", "2023-01-01", MatchResult::Win, "2023-01-01T00:00:00Z"))
            .await
            .unwrap();

        let replacement = vec![
            record("x", "2024-02-01", MatchResult::Loss, "2024-02-01T00:00:00Z"),
            record("y", "2024-02-02", MatchResult::Win, "2024-02-02T00:00:00Z"),
        ];
        repo.replace_all(&replacement).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), replacement);

        repo.replace_all(&[]).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert!(!repo.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_store_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();

        std::fs::write(repo.path(), "{ not json").unwrap();
        assert!(repo.list().await.unwrap().is_empty());

        std::fs::write(repo.path(), "{\"matches\": []}").unwrap();
        assert!(repo.list().await.unwrap().is_empty());

        // a write after a corrupt read starts over from an empty list
        let fresh = record("n", "2024-01-01", MatchResult::Win, "2024-01-01T00:00:00Z");
        repo.append(&fresh).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_undecodable_record_fails_without_losing_data() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();
        let stored = r#"[
  {"id": "a", "date": "2024-01-01", "result": "win", "createdAt": "2024-01-01T00:00:00.000Z"},
  {"id": "b", "date": "2024-01-02", "result": "loss", "createdAt": "imported"}
]"#;
        std::fs::write(repo.path(), stored).unwrap();

        assert!(matches!(
            repo.list().await,
            Err(RepoError::StorageError(msg)) if msg.contains("index 1")
        ));

        let fresh = record("n", "2024-01-03", MatchResult::Win, "2024-01-03T00:00:00Z");
        assert!(repo.append(&fresh).await.is_err());
        assert!(repo.delete_by_id(&MatchId("a".to_string())).await.is_err());
        assert_eq!(std::fs::read_to_string(repo.path()).unwrap(), stored);

        // an explicit replace still installs a clean collection
        repo.replace_all(std::slice::from_ref(&fresh)).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_store_recreated_when_removed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileMatchRepository::open(dir.path()).await.unwrap();
        std::fs::remove_file(repo.path()).unwrap();

        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FileMatchRepository::open(dir.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let created_at = format!("2024-01-01T00:00:{:02}Z", i);
                repo.append(&record(
                    &format!("m{}", i),
                    "2024-01-01",
                    MatchResult::Win,
                    &created_at,
                ))
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.list().await.unwrap().len(), 16);
    }
}
