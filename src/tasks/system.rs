//! System status refresh

use anyhow::Result;
use time::OffsetDateTime;
use tracing::debug;

use crate::db::Database;

pub const SYSTEM_MOVIE_COUNT: &str = "movie_count";
pub const SYSTEM_SERIES_COUNT: &str = "series_count";
pub const SYSTEM_EPISODE_COUNT: &str = "episode_count";
pub const SYSTEM_MISSING_MOVIE_COUNT: &str = "missing_movie_count";
pub const SYSTEM_LAST_SCAN: &str = "last_scan";

/// Recompute library counts into the system table
pub(super) async fn scan(db: &Database) -> Result<()> {
    let movies = db.movies();
    let series = db.series();
    let system = db.system();

    let movie_count = movies.count().await?;
    let missing_count = movies.count_missing().await?;
    let series_count = series.count().await?;
    let episode_count = series.count_episodes().await?;

    system.set(SYSTEM_MOVIE_COUNT, &movie_count.to_string()).await?;
    system.set(SYSTEM_MISSING_MOVIE_COUNT, &missing_count.to_string()).await?;
    system.set(SYSTEM_SERIES_COUNT, &series_count.to_string()).await?;
    system.set(SYSTEM_EPISODE_COUNT, &episode_count.to_string()).await?;

    let now = OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    system.set(SYSTEM_LAST_SCAN, &now).await?;

    debug!(
        movies = movie_count,
        missing_movies = missing_count,
        series = series_count,
        episodes = episode_count,
        "System status refreshed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UpsertMovie;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_counts_are_stored() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.init_schema().await.unwrap();
        db.movies()
            .upsert(UpsertMovie {
                id: "Up (2009)",
                path: "/movies/Up (2009)",
                filename: None,
                missing: true,
                monitored: true,
            })
            .await
            .unwrap();
        db.series().upsert("Dark", "/series/Dark", true).await.unwrap();
        db.series().upsert_episode("Dark", 1, 1, "a.mkv").await.unwrap();

        scan(&db).await.unwrap();
        scan(&db).await.unwrap();

        let system = db.system();
        assert_eq!(system.get(SYSTEM_MOVIE_COUNT).await.unwrap().as_deref(), Some("1"));
        assert_eq!(system.get(SYSTEM_MISSING_MOVIE_COUNT).await.unwrap().as_deref(), Some("1"));
        assert_eq!(system.get(SYSTEM_SERIES_COUNT).await.unwrap().as_deref(), Some("1"));
        assert_eq!(system.get(SYSTEM_EPISODE_COUNT).await.unwrap().as_deref(), Some("1"));
        assert!(system.get(SYSTEM_LAST_SCAN).await.unwrap().is_some());
        assert_eq!(system.all().await.unwrap().len(), 5);
    }
}
