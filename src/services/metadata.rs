//! Local metadata provider
//!
//! Fills in display names that are still empty after a scan, using only what
//! the library folder and file names tell us. Remote lookups are not done here.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::filename_parser::parse_title;
use crate::db::Database;
use crate::scan::item::{Item, ItemKind};

/// Derives names for movies, series and episodes from the library layout
#[derive(Clone)]
pub struct LocalMetadataProvider {
    db: Database,
}

impl LocalMetadataProvider {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Refresh metadata for one item
    pub async fn refresh(&self, item: &Item) -> Result<()> {
        match item.kind {
            ItemKind::Movie => self.refresh_movie(&item.id).await,
            ItemKind::Series => self.refresh_series(&item.id).await,
        }
    }

    async fn refresh_movie(&self, id: &str) -> Result<()> {
        let movies = self.db.movies();
        let movie = movies
            .get(id)
            .await
            .with_context(|| format!("Failed to load movie {id}"))?;

        if !movie.name.is_empty() {
            debug!(movie_id = %id, "Movie already has a name");
            return Ok(());
        }

        let parsed = parse_title(&movie.id);
        movies.set_name(id, &parsed.title).await?;
        info!(movie_id = %id, name = %parsed.title, year = ?parsed.year, "Movie name filled in");
        Ok(())
    }

    async fn refresh_series(&self, id: &str) -> Result<()> {
        let series_repo = self.db.series();
        let series = series_repo
            .get(id)
            .await
            .with_context(|| format!("Failed to load series {id}"))?;

        if series.name.is_empty() {
            let parsed = parse_title(&series.id);
            series_repo.set_name(id, &parsed.title).await?;
            info!(series_id = %id, name = %parsed.title, "Series name filled in");
        }

        let mut named = 0;
        for episode in series.seasons.iter().flat_map(|s| &s.episodes) {
            if episode.episode_name.is_empty() {
                let name = format!("Episode {}", episode.episode_number);
                series_repo
                    .set_episode_name(id, episode.season_number, episode.episode_number, &name)
                    .await?;
                named += 1;
            }
        }
        if named > 0 {
            info!(series_id = %id, episodes = named, "Episode names filled in");
        }

        Ok(())
    }
}
