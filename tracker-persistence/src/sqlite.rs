use std::{str::FromStr, time::Duration};

use chrono::SecondsFormat;
use sqlx::{
    Executor, Pool, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use tracker_domain::{
    match_record::{MatchId, MatchRecord, parse_timestamp},
    repository::{MatchRepository, RepoError, RepoResult},
};

const CREATE_MATCHES_TABLE: &str = "CREATE TABLE IF NOT EXISTS matches (
    id TEXT PRIMARY KEY NOT NULL,
    match_date TEXT NOT NULL,
    result TEXT NOT NULL CHECK (result IN ('win', 'loss')),
    created_at TEXT NOT NULL
)";

/// SQLite flavour of the relational backend. Timestamps are stored as
/// fixed-width UTC strings so `ORDER BY created_at` sorts chronologically.
pub struct SqliteMatchRepository {
    pool: Pool<Sqlite>,
}

impl SqliteMatchRepository {
    pub async fn connect(url: &str) -> RepoResult<Self> {
        let conn_options = SqliteConnectOptions::from_str(url)
            .map_err(RepoError::storage)?
            .create_if_missing(true);

        // every in-memory connection is its own database
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_lazy_with(conn_options)
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_lazy_with(conn_options)
        };

        let repo = Self { pool };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> RepoResult<()> {
        sqlx::query(CREATE_MATCHES_TABLE)
            .execute(&self.pool)
            .await
            .map_err(RepoError::storage)?;
        Ok(())
    }

    fn record_from_row(row: &SqliteRow) -> sqlx::Result<MatchRecord> {
        let result: String = row.try_get("result")?;
        let created_at: String = row.try_get("created_at")?;
        Ok(MatchRecord {
            id: MatchId(row.try_get("id")?),
            date: row.try_get("match_date")?,
            result: result
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            created_at: parse_timestamp(&created_at).ok_or_else(|| {
                sqlx::Error::Decode(format!("invalid created_at: {}", created_at).into())
            })?,
        })
    }

    async fn insert<'e, E>(executor: E, record: &MatchRecord) -> sqlx::Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO matches (id, match_date, result, created_at) VALUES (?, ?, ?, ?)")
            .bind(record.id.as_str())
            .bind(record.date)
            .bind(record.result.as_str())
            .bind(
                record
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            )
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MatchRepository for SqliteMatchRepository {
    async fn list(&self) -> RepoResult<Vec<MatchRecord>> {
        let rows = sqlx::query(
            "SELECT id, match_date, result, created_at FROM matches ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::storage)?;
        rows.iter()
            .map(Self::record_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(RepoError::storage)
    }

    async fn append(&self, record: &MatchRecord) -> RepoResult<()> {
        Self::insert(&self.pool, record)
            .await
            .map_err(RepoError::storage)
    }

    async fn delete_by_id(&self, id: &MatchId) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM matches WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(RepoError::storage)?;
        Ok(res.rows_affected() > 0)
    }

    async fn replace_all(&self, records: &[MatchRecord]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(RepoError::storage)?;
        sqlx::query("DELETE FROM matches")
            .execute(&mut *tx)
            .await
            .map_err(RepoError::storage)?;
        for record in records {
            Self::insert(&mut *tx, record)
                .await
                .map_err(RepoError::storage)?;
        }
        tx.commit().await.map_err(RepoError::storage)
    }
}

#[cfg(test)]
mod tests {
    use tracker_domain::match_record::MatchResult;

    use super::*;

    async fn memory_repo() -> SqliteMatchRepository {
        SqliteMatchRepository::connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn record(id: &str, date: &str, result: MatchResult, created_at: &str) -> MatchRecord {
        MatchRecord {
            id: MatchId(id.to_string()),
            date: date.parse().unwrap(),
            result,
            created_at: parse_timestamp(created_at).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let repo = memory_repo().await;
        repo.init().await.unwrap();
        repo.init().await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_list_orders_by_creation() {
        let repo = memory_repo().await;
        let b = record("b", "2024-01-01", MatchResult::Loss, "2024-01-01T10:00:00.500Z");
        let a = record("a", "2024-01-03", MatchResult::Win, "2024-01-01T10:00:00Z");
        let c = record("c", "2024-01-02", MatchResult::Win, "2024-01-01T11:00:00Z");
        for r in [&b, &a, &c] {
            repo.append(r).await.unwrap();
        }

        assert_eq!(repo.list().await.unwrap(), vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let repo = memory_repo().await;
        let a = record("a", "2024-01-01", MatchResult::Win, "2024-01-01T00:00:00Z");
        repo.append(&a).await.unwrap();

        assert!(!repo.delete_by_id(&MatchId("b".to_string())).await.unwrap());
        assert!(repo.delete_by_id(&a.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_swaps_collection() {
        let repo = memory_repo().await;
        repo.append(&record("old", "2023-05-05", MatchResult::Loss, "2023-05-05T00:00:00Z"))
            .await
            .unwrap();

        let replacement = vec![
            record("x", "2024-02-01", MatchResult::Win, "2024-02-01T00:00:00Z"),
            record("y", "2024-02-02", MatchResult::Loss, "2024-02-02T00:00:00Z"),
        ];
        repo.replace_all(&replacement).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), replacement);

        repo.replace_all(&replacement).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_failed_replace_rolls_back() {
        let repo = memory_repo().await;
        let existing = record("keep", "2023-05-05", MatchResult::Win, "2023-05-05T00:00:00Z");
        repo.append(&existing).await.unwrap();

        // the second insert violates the primary key
        let clashing = vec![
            record("dup", "2024-02-01", MatchResult::Win, "2024-02-01T00:00:00Z"),
            record("dup", "2024-02-02", MatchResult::Loss, "2024-02-02T00:00:00Z"),
        ];
        assert!(repo.replace_all(&clashing).await.is_err());
        assert_eq!(repo.list().await.unwrap(), vec![existing]);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("tracker.db").display());

        let repo = SqliteMatchRepository::connect(&url).await.unwrap();
        let a = record("a", "2024-01-01", MatchResult::Win, "2024-01-01T00:00:00Z");
        repo.append(&a).await.unwrap();
        repo.pool.close().await;

        let reopened = SqliteMatchRepository::connect(&url).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![a]);
    }
}
