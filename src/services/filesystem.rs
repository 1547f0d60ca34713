//! Library root listing
//!
//! Reads the entry names directly under the movie and series roots. Each
//! entry (folder) name is the identity of one movie or series.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::scan::traits::LibraryListing;

/// The two configured library roots
#[derive(Debug, Clone)]
pub struct LibraryDirectories {
    pub movies_path: PathBuf,
    pub series_path: PathBuf,
}

impl LibraryDirectories {
    pub fn new(movies_path: impl Into<PathBuf>, series_path: impl Into<PathBuf>) -> Self {
        Self {
            movies_path: movies_path.into(),
            series_path: series_path.into(),
        }
    }

    /// Folder of a movie. Fails for ids that would leave the movie root.
    pub fn movie_dir(&self, id: &str) -> Result<PathBuf> {
        Ok(self.movies_path.join(check_entry_name(id)?))
    }

    /// Folder of a series. Fails for ids that would leave the series root.
    pub fn series_dir(&self, id: &str) -> Result<PathBuf> {
        Ok(self.series_path.join(check_entry_name(id)?))
    }
}

/// An item id must name exactly one entry directly under a library root
pub fn check_entry_name(id: &str) -> Result<&str> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None)
            if name == OsStr::new(id) && !id.contains(['/', '\\']) =>
        {
            Ok(id)
        }
        _ => bail!("Invalid library entry name: {id:?}"),
    }
}

/// Names of all entries directly under `root`, sorted. Hidden entries are skipped.
pub async fn list_entry_names(root: &Path) -> Result<Vec<String>> {
    let mut reader = tokio::fs::read_dir(root)
        .await
        .with_context(|| format!("Failed to read directory {}", root.display()))?;

    let mut names = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .with_context(|| format!("Failed to read entry in {}", root.display()))?
    {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(root = %root.display(), entry = ?raw, "Skipping entry with a non UTF-8 name");
                continue;
            }
        };
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();

    debug!(root = %root.display(), entries = names.len(), "Listed library root");
    Ok(names)
}

#[async_trait]
impl LibraryListing for LibraryDirectories {
    async fn movie_entries(&self) -> Result<Vec<String>> {
        list_entry_names(&self.movies_path).await
    }

    async fn series_entries(&self) -> Result<Vec<String>> {
        list_entry_names(&self.series_path).await
    }
}
