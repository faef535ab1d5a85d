use std::str::FromStr;

use sqlx::{
    Executor, Pool, Postgres, Row,
    postgres::{PgConnectOptions, PgPoolOptions, PgRow},
};
use tracker_domain::{
    match_record::{MatchId, MatchRecord},
    repository::{MatchRepository, RepoError, RepoResult},
};

const CREATE_MATCHES_TABLE: &str = "CREATE TABLE IF NOT EXISTS matches (
    id TEXT PRIMARY KEY,
    match_date DATE NOT NULL,
    result TEXT NOT NULL CHECK (result IN ('win', 'loss')),
    created_at TIMESTAMPTZ NOT NULL
)";

pub struct PostgresMatchRepository {
    pool: Pool<Postgres>,
}

impl PostgresMatchRepository {
    /// Builds the pool and makes sure the `matches` table exists.
    pub async fn connect(url: &str) -> RepoResult<Self> {
        let conn_options = PgConnectOptions::from_str(url).map_err(RepoError::storage)?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(conn_options);
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

    fn record_from_row(row: &PgRow) -> sqlx::Result<MatchRecord> {
        let result: String = row.try_get("result")?;
        Ok(MatchRecord {
            id: MatchId(row.try_get("id")?),
            date: row.try_get("match_date")?,
            result: result
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn insert<'e, E>(executor: E, record: &MatchRecord) -> sqlx::Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO matches (id, match_date, result, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.id.as_str())
        .bind(record.date)
        .bind(record.result.as_str())
        .bind(record.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MatchRepository for PostgresMatchRepository {
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
        let res = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(RepoError::storage)?;
        Ok(res.rows_affected() > 0)
    }

    async fn replace_all(&self, records: &[MatchRecord]) -> RepoResult<()> {
        // dropping the transaction on an early return rolls it back
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
