//! Series scan and validation

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::{FsLibraryTasks, find_video_files};
use crate::scan::item::Item;
use crate::services::filename_parser::parse_episode;

/// Record the series folder and every episode file in it
pub(super) async fn scan(tasks: &FsLibraryTasks, id: &str) -> Result<()> {
    let dir = tasks.dirs.series_dir(id)?;
    if !tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        debug!(series_id = %id, path = %dir.display(), "Series folder not found, skipping scan");
        return Ok(());
    }

    let series = tasks.db.series();
    series
        .upsert(id, &dir.to_string_lossy(), tasks.default_monitored)
        .await
        .with_context(|| format!("Failed to store series {id}"))?;

    let files = find_video_files(dir).await?;
    let mut linked = 0;
    for file in &files {
        let parsed = parse_episode(&file.file_name);
        let (Some(season), Some(episode)) = (parsed.season, parsed.episode) else {
            debug!(series_id = %id, file = %file.relative_path, "Not an episode file");
            continue;
        };

        series
            .upsert_episode(id, season.into(), episode.into(), &file.relative_path)
            .await
            .with_context(|| format!("Failed to store episode S{season:02}E{episode:02} of {id}"))?;
        linked += 1;
    }

    debug!(series_id = %id, video_files = files.len(), episodes = linked, "Series scanned");

    request_encode_if_needed(tasks, id).await
}

/// Ask for one encode of a monitored series when any of its episode files
/// does not match the series profile
async fn request_encode_if_needed(tasks: &FsLibraryTasks, id: &str) -> Result<()> {
    let record = tasks.db.series().get(id).await?;
    if !record.monitored {
        return Ok(());
    }
    let Some(profile_id) = record.profile_id else {
        debug!(series_id = %id, "Series has no profile, skipping encode check");
        return Ok(());
    };
    let profile = match tasks.db.profiles().get(profile_id).await {
        Ok(profile) => profile,
        Err(e) if e.is_not_found() => {
            warn!(series_id = %id, profile_id, "Series profile does not exist");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let pending = record
        .seasons
        .iter()
        .flat_map(|season| &season.episodes)
        .filter(|episode| {
            episode
                .filename
                .as_deref()
                .is_some_and(|f| profile.needs_encode(f))
        })
        .count();
    if pending > 0 {
        debug!(series_id = %id, episodes = pending, profile = %profile.name, "Episodes need encoding");
        tasks.encode.enqueue(Item::series(id));
    }
    Ok(())
}

/// Drop a vanished series, or the episodes whose files are gone
pub(super) async fn validate(tasks: &FsLibraryTasks, id: &str) -> Result<()> {
    let dir = tasks.dirs.series_dir(id)?;
    let series = tasks.db.series();

    if !tokio::fs::try_exists(&dir).await.unwrap_or(true) {
        if series.delete(id).await? {
            info!(series_id = %id, "Series folder removed, deleted record");
        }
        return Ok(());
    }

    let mut removed = 0;
    for episode in series.episodes(id).await? {
        let Some(filename) = episode.filename.as_deref() else {
            continue;
        };
        if tokio::fs::try_exists(dir.join(filename)).await.unwrap_or(true) {
            continue;
        }
        if series
            .delete_episode(id, episode.season_number, episode.episode_number)
            .await?
        {
            removed += 1;
        }
    }

    if removed > 0 {
        let seasons = series.delete_empty_seasons(id).await?;
        info!(series_id = %id, episodes = removed, seasons, "Removed episodes with missing files");
    }
    Ok(())
}
