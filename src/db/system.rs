//! System status key/value repository

use chrono::Utc;
use sqlx::SqlitePool;

use super::error::RepoResult;

#[derive(Clone)]
pub struct SystemRepository {
    pool: SqlitePool,
}

impl SystemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM system WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn all(&self) -> RepoResult<Vec<(String, String)>> {
        let rows = sqlx::query_as("SELECT key, value FROM system ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
