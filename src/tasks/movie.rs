//! Movie scan and validation

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{FsLibraryTasks, find_video_files};
use crate::db::UpsertMovie;

/// Record the movie folder's current state. A folder that does not exist is
/// left for [validate] to handle.
pub(super) async fn scan(tasks: &FsLibraryTasks, id: &str) -> Result<()> {
    let dir = tasks.dirs.movie_dir(id)?;
    if !tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        debug!(movie_id = %id, path = %dir.display(), "Movie folder not found, skipping scan");
        return Ok(());
    }

    let files = find_video_files(dir.clone()).await?;
    let main_file = files.iter().max_by_key(|f| f.size);
    let path = dir.to_string_lossy();

    tasks
        .db
        .movies()
        .upsert(UpsertMovie {
            id,
            path: &path,
            filename: main_file.map(|f| f.relative_path.as_str()),
            missing: main_file.is_none(),
            monitored: tasks.default_monitored,
        })
        .await
        .with_context(|| format!("Failed to store movie {id}"))?;

    debug!(
        movie_id = %id,
        video_files = files.len(),
        filename = ?main_file.map(|f| &f.file_name),
        "Movie scanned"
    );
    Ok(())
}

/// Drop the record of a movie whose folder is gone
pub(super) async fn validate(tasks: &FsLibraryTasks, id: &str) -> Result<()> {
    let dir = tasks.dirs.movie_dir(id)?;
    if tokio::fs::try_exists(&dir).await.unwrap_or(true) {
        return Ok(());
    }

    if tasks.db.movies().delete(id).await? {
        info!(movie_id = %id, "Movie folder removed, deleted record");
    }
    Ok(())
}
