//! Seeds the scan queue from the library roots and the repositories

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use super::item::{Item, ItemKind};
use super::queue::ScanQueue;
use super::traits::{LibraryListing, MovieStore, SeriesStore};

/// Enqueues every known movie and series.
///
/// Each kind is seeded from two independent sources, the on-disk entries and
/// the stored records. The union is enqueued so that new folders and records
/// whose folder disappeared are both reconciled. A failing source is logged
/// and skipped without affecting the other.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<ScanQueue>,
    listing: Arc<dyn LibraryListing>,
    movies: Arc<dyn MovieStore>,
    series: Arc<dyn SeriesStore>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<ScanQueue>,
        listing: Arc<dyn LibraryListing>,
        movies: Arc<dyn MovieStore>,
        series: Arc<dyn SeriesStore>,
    ) -> Self {
        Self {
            queue,
            listing,
            movies,
            series,
        }
    }

    /// Enqueue every movie folder and every movie record.
    /// Returns how many items were newly queued.
    pub async fn enqueue_all_movies(&self) -> usize {
        let from_disk = self
            .seed(ItemKind::Movie, "disk", self.listing.movie_entries().await)
            .await;

        let records: Result<Vec<String>> = self
            .movies
            .list_movies()
            .await
            .map(|movies| movies.into_iter().map(|m| m.id).collect());
        let from_repo = self.seed(ItemKind::Movie, "repository", records).await;

        info!(kind = "movie", queued = from_disk + from_repo, "Movie dispatch finished");
        from_disk + from_repo
    }

    /// Enqueue every series folder and every series record.
    /// Returns how many items were newly queued.
    pub async fn enqueue_all_series(&self) -> usize {
        let from_disk = self
            .seed(ItemKind::Series, "disk", self.listing.series_entries().await)
            .await;

        let records: Result<Vec<String>> = self
            .series
            .list_series()
            .await
            .map(|series| series.into_iter().map(|s| s.id).collect());
        let from_repo = self.seed(ItemKind::Series, "repository", records).await;

        info!(kind = "series", queued = from_disk + from_repo, "Series dispatch finished");
        from_disk + from_repo
    }

    pub async fn enqueue_all(&self) -> usize {
        self.enqueue_all_movies().await + self.enqueue_all_series().await
    }

    async fn seed(&self, kind: ItemKind, source: &str, ids: Result<Vec<String>>) -> usize {
        let ids = match ids {
            Ok(ids) => ids,
            Err(e) => {
                warn!(kind = %kind, source = %source, error = %e, "Failed to list entries for dispatch");
                return 0;
            }
        };

        ids.into_iter()
            .filter(|id| self.queue.enqueue(Item::new(kind, id.as_str())))
            .count()
    }
}
