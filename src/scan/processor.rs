//! Per-item reconciliation
//!
//! Runs the scan and validate tasks for one item, reloads its record and
//! decides whether the metadata or encode queues need to hear about it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::item::{Item, ItemKind};
use super::traits::{
    EncodeQueue, EventLevel, EventLog, LibraryTasks, MetadataQueue, MovieStore, SeriesStore,
};
use crate::db::SeriesRecord;

/// Processes one dequeued item at a time. Holds no queue state.
#[derive(Clone)]
pub struct ItemProcessor {
    movies: Arc<dyn MovieStore>,
    series: Arc<dyn SeriesStore>,
    tasks: Arc<dyn LibraryTasks>,
    metadata: Arc<dyn MetadataQueue>,
    encode: Arc<dyn EncodeQueue>,
    events: Arc<dyn EventLog>,
}

impl ItemProcessor {
    pub fn new(
        movies: Arc<dyn MovieStore>,
        series: Arc<dyn SeriesStore>,
        tasks: Arc<dyn LibraryTasks>,
        metadata: Arc<dyn MetadataQueue>,
        encode: Arc<dyn EncodeQueue>,
        events: Arc<dyn EventLog>,
    ) -> Self {
        Self {
            movies,
            series,
            tasks,
            metadata,
            encode,
            events,
        }
    }

    /// Reconcile one item. An error means the item was abandoned part way;
    /// the caller still completes its key.
    pub async fn process(&self, item: &Item) -> Result<()> {
        match item.kind {
            ItemKind::Movie => self.process_movie(item).await,
            ItemKind::Series => self.process_series(item).await,
        }
    }

    /// Refresh the system-wide status after an item
    pub async fn refresh_system(&self) -> Result<()> {
        self.tasks.scan_system().await
    }

    async fn process_movie(&self, item: &Item) -> Result<()> {
        if let Err(e) = self.tasks.scan_movie(&item.id).await {
            warn!(item_id = %item.id, kind = "movie", error = %e, "Movie scan failed");
        }
        if let Err(e) = self.tasks.validate_movie(&item.id).await {
            warn!(item_id = %item.id, kind = "movie", error = %e, "Movie validation failed");
        }

        let movie = self
            .movies
            .get_movie(&item.id)
            .await
            .with_context(|| format!("Failed to reload movie {}", item.id))?;

        if movie.name.is_empty() {
            self.events.log(
                EventLevel::Info,
                "scan",
                &format!("Scanning movie: {}", item.id),
            );
            self.metadata.enqueue(item.clone());
        }

        if movie.missing && movie.monitored {
            debug!(item_id = %item.id, "Monitored movie is missing, requesting encode");
            self.encode.enqueue(item.clone());
        }

        Ok(())
    }

    async fn process_series(&self, item: &Item) -> Result<()> {
        self.events.log(
            EventLevel::Info,
            "scan",
            &format!("Scanning series: {}", item.id),
        );

        if let Err(e) = self.tasks.scan_series(&item.id).await {
            warn!(item_id = %item.id, kind = "series", error = %e, "Series scan failed");
        }
        if let Err(e) = self.tasks.validate_series(&item.id).await {
            warn!(item_id = %item.id, kind = "series", error = %e, "Series validation failed");
        }

        // A failed reload still falls through to the name check with an
        // empty record, which requests metadata for the series.
        let series = match self.series.get_series(&item.id).await {
            Ok(series) => series,
            Err(e) => {
                warn!(item_id = %item.id, kind = "series", error = %e, "Failed to reload series");
                SeriesRecord {
                    id: item.id.clone(),
                    ..Default::default()
                }
            }
        };

        if series.name.is_empty() {
            self.metadata.enqueue(item.clone());
            return Ok(());
        }

        // One unnamed episode refreshes the whole series, once
        let unnamed = series
            .seasons
            .iter()
            .flat_map(|season| season.episodes.iter())
            .find(|episode| episode.episode_name.is_empty());
        if let Some(episode) = unnamed {
            debug!(
                item_id = %item.id,
                season = episode.season_number,
                episode = episode.episode_number,
                "Episode without name, requesting series metadata"
            );
            self.metadata.enqueue(item.clone());
        }

        Ok(())
    }
}
