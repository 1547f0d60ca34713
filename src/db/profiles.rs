//! Encode profile repository

use sqlx::SqlitePool;

use super::error::{RepoResult, RepositoryError};

/// Target format media assigned to this profile is encoded into
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: i64,
    pub name: String,
    /// File extension of encoded output, e.g. `mkv`
    pub container: String,
    pub codec: String,
}

impl ProfileRecord {
    /// Whether a video file still has to be encoded to match this profile
    pub fn needs_encode(&self, filename: &str) -> bool {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        !extension.eq_ignore_ascii_case(&self.container)
    }
}

#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> RepoResult<Vec<ProfileRecord>> {
        let records = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, name, container, codec FROM profiles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn get(&self, id: i64) -> RepoResult<ProfileRecord> {
        sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, name, container, codec FROM profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("profile", id.to_string()))
    }
}
