//! Filesystem reconciliation tasks
//!
//! Bring the database in line with what is on disk for one movie or series
//! at a time, plus a system-wide status refresh. All tasks are idempotent.

mod movie;
mod series;
mod system;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use walkdir::WalkDir;

use crate::db::Database;
use crate::scan::traits::{EncodeQueue, LibraryTasks};
use crate::services::filename_parser::is_video_file;
use crate::services::filesystem::LibraryDirectories;

pub use system::{
    SYSTEM_EPISODE_COUNT, SYSTEM_LAST_SCAN, SYSTEM_MISSING_MOVIE_COUNT, SYSTEM_MOVIE_COUNT,
    SYSTEM_SERIES_COUNT,
};

/// Video file found under a library folder
#[derive(Debug, Clone)]
pub(crate) struct VideoFile {
    /// Path relative to the folder that was walked
    pub relative_path: String,
    pub file_name: String,
    pub size: u64,
}

/// Collect all video files below `dir`. Runs on the blocking pool.
pub(crate) async fn find_video_files(dir: PathBuf) -> Result<Vec<VideoFile>> {
    tokio::task::spawn_blocking(move || walk_video_files(&dir))
        .await
        .context("Video file walk panicked")
}

fn walk_video_files(dir: &Path) -> Vec<VideoFile> {
    let mut files: Vec<VideoFile> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_str()?.to_string();
            if !is_video_file(&file_name) {
                return None;
            }
            let relative_path = entry
                .path()
                .strip_prefix(dir)
                .ok()?
                .to_string_lossy()
                .to_string();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            Some(VideoFile {
                relative_path,
                file_name,
                size,
            })
        })
        .collect();

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    files
}

/// [LibraryTasks] backed by the library roots and the SQLite repositories
#[derive(Clone)]
pub struct FsLibraryTasks {
    dirs: LibraryDirectories,
    db: Database,
    /// Receives series whose episode files do not match their profile
    encode: Arc<dyn EncodeQueue>,
    /// Monitored flag for newly discovered movies and series
    default_monitored: bool,
}

impl FsLibraryTasks {
    pub fn new(
        dirs: LibraryDirectories,
        db: Database,
        encode: Arc<dyn EncodeQueue>,
        default_monitored: bool,
    ) -> Self {
        Self {
            dirs,
            db,
            encode,
            default_monitored,
        }
    }
}

#[async_trait]
impl LibraryTasks for FsLibraryTasks {
    async fn scan_movie(&self, id: &str) -> Result<()> {
        movie::scan(self, id).await
    }

    async fn validate_movie(&self, id: &str) -> Result<()> {
        movie::validate(self, id).await
    }

    async fn scan_series(&self, id: &str) -> Result<()> {
        series::scan(self, id).await
    }

    async fn validate_series(&self, id: &str) -> Result<()> {
        series::validate(self, id).await
    }

    async fn scan_system(&self) -> Result<()> {
        system::scan(&self.db).await
    }
}
