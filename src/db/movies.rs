//! Movie database repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::error::{RepoResult, RepositoryError};
use crate::scan::traits::MovieStore;

/// Movie record from database
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct MovieRecord {
    /// Folder name under the movie library root
    pub id: String,
    /// Display name; empty until metadata has been filled in
    pub name: String,
    pub path: Option<String>,
    /// Main video file inside the movie folder
    pub filename: Option<String>,
    /// No video file was found for the movie
    pub missing: bool,
    pub monitored: bool,
    /// Encode profile; new records get the default profile setting
    pub profile_id: Option<i64>,
}

/// Input for upserting a movie discovered on disk
#[derive(Debug)]
pub struct UpsertMovie<'a> {
    pub id: &'a str,
    pub path: &'a str,
    pub filename: Option<&'a str>,
    pub missing: bool,
    /// Only applied when the record is created
    pub monitored: bool,
}

#[derive(Clone)]
pub struct MovieRepository {
    pool: SqlitePool,
}

impl MovieRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all movies
    pub async fn list(&self) -> RepoResult<Vec<MovieRecord>> {
        let records = sqlx::query_as::<_, MovieRecord>(
            r#"
            SELECT id, name, path, filename, missing, monitored, profile_id
            FROM movies
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a movie by ID
    pub async fn get(&self, id: &str) -> RepoResult<MovieRecord> {
        sqlx::query_as::<_, MovieRecord>(
            r#"
            SELECT id, name, path, filename, missing, monitored, profile_id
            FROM movies
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("movie", id))
    }

    /// Insert a movie or refresh its on-disk state. Name, monitored flag and
    /// profile of an existing record are left untouched.
    pub async fn upsert(&self, input: UpsertMovie<'_>) -> RepoResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO movies (id, name, path, filename, missing, monitored, profile_id, created_at, updated_at)
            VALUES (?, '', ?, ?, ?, ?,
                (SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'default_profile'),
                ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                path = excluded.path,
                filename = excluded.filename,
                missing = excluded.missing,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(input.id)
        .bind(input.path)
        .bind(input.filename)
        .bind(input.missing)
        .bind(input.monitored)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_name(&self, id: &str, name: &str) -> RepoResult<()> {
        let result = sqlx::query("UPDATE movies SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("movie", id));
        }
        Ok(())
    }

    pub async fn set_monitored(&self, id: &str, monitored: bool) -> RepoResult<()> {
        let result = sqlx::query("UPDATE movies SET monitored = ?, updated_at = ? WHERE id = ?")
            .bind(monitored)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("movie", id));
        }
        Ok(())
    }

    /// Delete a movie. Returns whether a record was removed.
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_missing(&self) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movies WHERE missing = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MovieStore for MovieRepository {
    async fn list_movies(&self) -> anyhow::Result<Vec<MovieRecord>> {
        Ok(self.list().await?)
    }

    async fn get_movie(&self, id: &str) -> anyhow::Result<MovieRecord> {
        Ok(self.get(id).await?)
    }
}
