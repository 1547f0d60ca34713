//! Series, season and episode database repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::error::{RepoResult, RepositoryError};
use crate::scan::traits::SeriesStore;

/// Series record from database
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct SeriesRecord {
    /// Folder name under the series library root
    pub id: String,
    /// Display name; empty until metadata has been filled in
    pub name: String,
    pub path: Option<String>,
    pub monitored: bool,
    /// Encode profile; new records get the default profile setting
    pub profile_id: Option<i64>,
    /// Loaded by [SeriesRepository::get]; left empty by [SeriesRepository::list]
    #[sqlx(skip)]
    pub seasons: Vec<SeasonRecord>,
}

/// Season of a series with its episodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonRecord {
    pub season_number: i64,
    pub episodes: Vec<EpisodeRecord>,
}

/// Episode record from database
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct EpisodeRecord {
    pub series_id: String,
    pub season_number: i64,
    pub episode_number: i64,
    /// Display name; empty until metadata has been filled in
    pub episode_name: String,
    /// Video file path relative to the series folder
    pub filename: Option<String>,
}

#[derive(Clone)]
pub struct SeriesRepository {
    pool: SqlitePool,
}

impl SeriesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all series without their seasons
    pub async fn list(&self) -> RepoResult<Vec<SeriesRecord>> {
        let records = sqlx::query_as::<_, SeriesRecord>(
            r#"
            SELECT id, name, path, monitored, profile_id
            FROM series
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a series with all seasons and episodes, ordered by number
    pub async fn get(&self, id: &str) -> RepoResult<SeriesRecord> {
        let mut series = sqlx::query_as::<_, SeriesRecord>(
            r#"
            SELECT id, name, path, monitored, profile_id
            FROM series
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("series", id))?;

        let season_numbers: Vec<(i64,)> = sqlx::query_as(
            "SELECT season_number FROM seasons WHERE series_id = ? ORDER BY season_number",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let episodes = self.episodes(id).await?;

        series.seasons = season_numbers
            .into_iter()
            .map(|(season_number,)| SeasonRecord {
                season_number,
                episodes: episodes
                    .iter()
                    .filter(|e| e.season_number == season_number)
                    .cloned()
                    .collect(),
            })
            .collect();

        Ok(series)
    }

    /// All episodes of a series
    pub async fn episodes(&self, series_id: &str) -> RepoResult<Vec<EpisodeRecord>> {
        let records = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT series_id, season_number, episode_number, episode_name, filename
            FROM episodes
            WHERE series_id = ?
            ORDER BY season_number, episode_number
            "#,
        )
        .bind(series_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Insert a series or refresh its path. Name, monitored flag and profile
    /// of an existing record are left untouched.
    pub async fn upsert(&self, id: &str, path: &str, monitored: bool) -> RepoResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO series (id, name, path, monitored, profile_id, created_at, updated_at)
            VALUES (?, '', ?, ?,
                (SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'default_profile'),
                ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                path = excluded.path,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(path)
        .bind(monitored)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert an episode (and its season) or refresh its filename
    pub async fn upsert_episode(
        &self,
        series_id: &str,
        season_number: i64,
        episode_number: i64,
        filename: &str,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO seasons (series_id, season_number) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(series_id)
        .bind(season_number)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO episodes (series_id, season_number, episode_number, episode_name, filename)
            VALUES (?, ?, ?, '', ?)
            ON CONFLICT(series_id, season_number, episode_number) DO UPDATE SET
                filename = excluded.filename
            "#,
        )
        .bind(series_id)
        .bind(season_number)
        .bind(episode_number)
        .bind(filename)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_name(&self, id: &str, name: &str) -> RepoResult<()> {
        let result = sqlx::query("UPDATE series SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("series", id));
        }
        Ok(())
    }

    pub async fn set_episode_name(
        &self,
        series_id: &str,
        season_number: i64,
        episode_number: i64,
        name: &str,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE episodes SET episode_name = ?
            WHERE series_id = ? AND season_number = ? AND episode_number = ?
            "#,
        )
        .bind(name)
        .bind(series_id)
        .bind(season_number)
        .bind(episode_number)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(
                "episode",
                format!("{series_id} S{season_number:02}E{episode_number:02}"),
            ));
        }
        Ok(())
    }

    pub async fn delete_episode(
        &self,
        series_id: &str,
        season_number: i64,
        episode_number: i64,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "DELETE FROM episodes WHERE series_id = ? AND season_number = ? AND episode_number = ?",
        )
        .bind(series_id)
        .bind(season_number)
        .bind(episode_number)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove seasons that no longer have any episode. Returns how many were removed.
    pub async fn delete_empty_seasons(&self, series_id: &str) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM seasons
            WHERE series_id = ?
              AND NOT EXISTS (
                SELECT 1 FROM episodes
                WHERE episodes.series_id = seasons.series_id
                  AND episodes.season_number = seasons.season_number
              )
            "#,
        )
        .bind(series_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a series with its seasons and episodes. Returns whether the
    /// series existed.
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM episodes WHERE series_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM seasons WHERE series_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM series WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM series")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_episodes(&self) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM episodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl SeriesStore for SeriesRepository {
    async fn list_series(&self) -> anyhow::Result<Vec<SeriesRecord>> {
        Ok(self.list().await?)
    }

    async fn get_series(&self, id: &str) -> anyhow::Result<SeriesRecord> {
        Ok(self.get(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn repo() -> SeriesRepository {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.init_schema().await.unwrap();
        db.series()
    }

    #[tokio::test]
    async fn test_get_groups_episodes_by_season() {
        let series = repo().await;
        series.upsert("Dark", "/series/Dark", true).await.unwrap();
        series.upsert_episode("Dark", 2, 1, "S02/Dark.S02E01.mkv").await.unwrap();
        series.upsert_episode("Dark", 1, 2, "S01/Dark.S01E02.mkv").await.unwrap();
        series.upsert_episode("Dark", 1, 1, "S01/Dark.S01E01.mkv").await.unwrap();
        series.set_episode_name("Dark", 1, 1, "Secrets").await.unwrap();

        let record = series.get("Dark").await.unwrap();
        let layout: Vec<(i64, Vec<i64>)> = record
            .seasons
            .iter()
            .map(|s| {
                (
                    s.season_number,
                    s.episodes.iter().map(|e| e.episode_number).collect(),
                )
            })
            .collect();

        assert_eq!(layout, vec![(1, vec![1, 2]), (2, vec![1])]);
        assert_eq!(record.seasons[0].episodes[0].episode_name, "Secrets");
        assert_eq!(record.seasons[0].episodes[1].episode_name, "");
    }

    #[tokio::test]
    async fn test_new_series_take_default_profile() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.init_schema().await.unwrap();
        let series = db.series();
        series.upsert("Dark", "/series/Dark", true).await.unwrap();

        db.settings()
            .set(crate::db::SETTING_DEFAULT_PROFILE, "2")
            .await
            .unwrap();
        series.upsert("Dark", "/series/Dark", true).await.unwrap();
        series.upsert("Fargo", "/series/Fargo", true).await.unwrap();

        assert_eq!(series.get("Dark").await.unwrap().profile_id, Some(1));
        assert_eq!(series.get("Fargo").await.unwrap().profile_id, Some(2));
    }

    #[tokio::test]
    async fn test_delete_empty_seasons() {
        let series = repo().await;
        series.upsert("Dark", "/series/Dark", true).await.unwrap();
        series.upsert_episode("Dark", 1, 1, "a.mkv").await.unwrap();
        series.upsert_episode("Dark", 2, 1, "b.mkv").await.unwrap();

        assert!(series.delete_episode("Dark", 2, 1).await.unwrap());
        assert_eq!(series.delete_empty_seasons("Dark").await.unwrap(), 1);
        assert_eq!(series.get("Dark").await.unwrap().seasons.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let series = repo().await;
        series.upsert("Dark", "/series/Dark", true).await.unwrap();
        series.upsert_episode("Dark", 1, 1, "a.mkv").await.unwrap();

        assert!(series.delete("Dark").await.unwrap());
        assert!(series.get("Dark").await.unwrap_err().is_not_found());
        assert_eq!(series.count_episodes().await.unwrap(), 0);
    }
}
