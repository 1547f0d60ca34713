//! Integration tests for the scan pipeline
//!
//! These tests drive [ScanService] end to end against in-memory collaborators:
//! - Dispatch from disk entries and stored records
//! - Worker ordering, completion and re-eligibility of keys
//! - Metadata and encode triggers
//! - Worker lifecycle

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use transfigurr::db::{EpisodeRecord, MovieRecord, SeasonRecord, SeriesRecord};
use transfigurr::scan::traits::{
    EncodeQueue, EventLevel, EventLog, LibraryListing, LibraryTasks, MetadataQueue, MovieStore,
    SeriesStore,
};
use transfigurr::scan::{Item, ScanCollaborators, ScanService};

// ============================================================================
// In-memory library
// ============================================================================

#[derive(Default)]
struct FakeLibrary {
    disk_movies: Vec<String>,
    disk_series: Vec<String>,
    movies: Mutex<HashMap<String, MovieRecord>>,
    series: Mutex<HashMap<String, SeriesRecord>>,
    /// Scan task calls in the order the worker made them
    scanned: Mutex<Vec<Item>>,
    metadata: Mutex<Vec<Item>>,
    encode: Mutex<Vec<Item>>,
    events: Mutex<Vec<(EventLevel, String)>>,
    system_refreshes: AtomicUsize,
    /// When set, each scan task waits for one permit after recording itself
    gate: Option<Arc<Semaphore>>,
}

impl FakeLibrary {
    fn add_movie(&self, id: &str, name: &str, missing: bool, monitored: bool) {
        self.movies.lock().insert(
            id.to_string(),
            MovieRecord {
                id: id.to_string(),
                name: name.to_string(),
                missing,
                monitored,
                ..Default::default()
            },
        );
    }

    fn add_series(&self, id: &str, name: &str, seasons: Vec<SeasonRecord>) {
        self.series.lock().insert(
            id.to_string(),
            SeriesRecord {
                id: id.to_string(),
                name: name.to_string(),
                monitored: true,
                seasons,
                ..Default::default()
            },
        );
    }

    async fn record_scan(&self, item: Item) {
        self.scanned.lock().push(item);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn refreshes(&self) -> usize {
        self.system_refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MovieStore for FakeLibrary {
    async fn list_movies(&self) -> Result<Vec<MovieRecord>> {
        let mut movies: Vec<MovieRecord> = self.movies.lock().values().cloned().collect();
        movies.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(movies)
    }

    async fn get_movie(&self, id: &str) -> Result<MovieRecord> {
        self.movies
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("movie {id} not found"))
    }
}

#[async_trait]
impl SeriesStore for FakeLibrary {
    async fn list_series(&self) -> Result<Vec<SeriesRecord>> {
        let mut series: Vec<SeriesRecord> = self.series.lock().values().cloned().collect();
        series.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(series)
    }

    async fn get_series(&self, id: &str) -> Result<SeriesRecord> {
        self.series
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("series {id} not found"))
    }
}

#[async_trait]
impl LibraryListing for FakeLibrary {
    async fn movie_entries(&self) -> Result<Vec<String>> {
        Ok(self.disk_movies.clone())
    }

    async fn series_entries(&self) -> Result<Vec<String>> {
        Ok(self.disk_series.clone())
    }
}

#[async_trait]
impl LibraryTasks for FakeLibrary {
    async fn scan_movie(&self, id: &str) -> Result<()> {
        self.record_scan(Item::movie(id)).await;
        Ok(())
    }

    async fn validate_movie(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn scan_series(&self, id: &str) -> Result<()> {
        self.record_scan(Item::series(id)).await;
        Ok(())
    }

    async fn validate_series(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn scan_system(&self) -> Result<()> {
        self.system_refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MetadataQueue for FakeLibrary {
    fn enqueue(&self, item: Item) {
        self.metadata.lock().push(item);
    }
}

impl EncodeQueue for FakeLibrary {
    fn enqueue(&self, item: Item) {
        self.encode.lock().push(item);
    }
}

impl EventLog for FakeLibrary {
    fn log(&self, level: EventLevel, _source: &str, message: &str) {
        self.events.lock().push((level, message.to_string()));
    }
}

fn scan_service(library: &Arc<FakeLibrary>) -> ScanService {
    ScanService::new(ScanCollaborators {
        movies: library.clone(),
        series: library.clone(),
        listing: library.clone(),
        tasks: library.clone(),
        metadata: library.clone(),
        encode: library.clone(),
        events: library.clone(),
    })
}

/// Poll until `done` holds or a second has passed
async fn wait_for(mut done: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

// ============================================================================
// Dispatch
// ============================================================================

mod dispatch {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_union_of_disk_and_repository_processed_once_each() {
        let library = Arc::new(FakeLibrary {
            disk_movies: vec!["A".into(), "B".into()],
            ..Default::default()
        });
        library.add_movie("B", "B", false, false);
        library.add_movie("C", "C", false, false);
        let scan = scan_service(&library);

        assert_eq!(scan.enqueue_all_movies().await, 3);
        scan.startup();
        wait_for(|| library.refreshes() == 3).await;

        assert_eq!(
            *library.scanned.lock(),
            vec![Item::movie("A"), Item::movie("B"), Item::movie("C")]
        );
        scan.stop().await;
    }

    #[tokio::test]
    async fn test_enqueue_all_seeds_movies_then_series() {
        let library = Arc::new(FakeLibrary {
            disk_movies: vec!["Fargo (1996)".into()],
            disk_series: vec!["Fargo".into()],
            ..Default::default()
        });
        let scan = scan_service(&library);

        assert_eq!(scan.enqueue_all().await, 2);
        assert_eq!(scan.enqueue_all_series().await, 0);
        assert_eq!(scan.queue().len(), 2);
    }
}

// ============================================================================
// Worker
// ============================================================================

mod worker {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_items_processed_in_arrival_order() {
        let library = Arc::new(FakeLibrary::default());
        for id in ["A", "B", "C"] {
            library.add_movie(id, id, false, false);
        }
        let scan = scan_service(&library);

        assert!(scan.enqueue(Item::movie("A")));
        assert!(scan.enqueue(Item::series("B")));
        assert!(scan.enqueue(Item::movie("C")));
        scan.startup();
        wait_for(|| library.refreshes() == 3).await;

        assert_eq!(
            *library.scanned.lock(),
            vec![Item::movie("A"), Item::series("B"), Item::movie("C")]
        );
        assert_eq!(scan.queue().pending_len(), 0);
        scan.stop().await;
    }

    #[tokio::test]
    async fn test_in_flight_request_dropped_then_key_eligible_again() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(FakeLibrary {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        library.add_movie("Heat", "Heat", false, false);
        let scan = scan_service(&library);
        scan.startup();

        assert!(scan.enqueue(Item::movie("Heat")));
        wait_for(|| library.scanned.lock().len() == 1).await;

        // In flight: key still pending, request is a no-op
        assert!(!scan.enqueue(Item::movie("Heat")));
        assert_eq!(scan.queue().len(), 0);
        assert_eq!(scan.queue().pending_len(), 1);

        gate.add_permits(1);
        wait_for(|| library.refreshes() == 1).await;
        assert_eq!(scan.queue().pending_len(), 0);

        assert!(scan.enqueue(Item::movie("Heat")));
        gate.add_permits(1);
        wait_for(|| library.refreshes() == 2).await;
        assert_eq!(library.scanned.lock().len(), 2);
        scan.stop().await;
    }

    #[tokio::test]
    async fn test_failed_item_is_completed_and_loop_continues() {
        let library = Arc::new(FakeLibrary::default());
        library.add_movie("Heat", "Heat", false, false);
        let scan = scan_service(&library);
        scan.startup();

        scan.enqueue(Item::movie("Gone"));
        scan.enqueue(Item::movie("Heat"));
        wait_for(|| library.refreshes() == 2).await;

        assert_eq!(scan.queue().pending_len(), 0);
        assert!(scan.enqueue(Item::movie("Gone")));
        scan.stop().await;
    }

    #[tokio::test]
    async fn test_concurrent_producers_schedule_one_instance() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(FakeLibrary {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        library.add_series("Dark", "Dark", vec![]);
        let scan = Arc::new(scan_service(&library));
        scan.startup();

        let producers: Vec<_> = (0..16)
            .map(|_| {
                let scan = scan.clone();
                tokio::spawn(async move { scan.enqueue(Item::series("Dark")) })
            })
            .collect();
        let mut accepted = 0;
        for producer in producers {
            if producer.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);

        gate.add_permits(1);
        wait_for(|| library.refreshes() == 1).await;
        assert_eq!(*library.scanned.lock(), vec![Item::series("Dark")]);
        scan.stop().await;
    }
}

// ============================================================================
// Metadata and encode triggers
// ============================================================================

mod triggers {
    use super::*;
    use pretty_assertions::assert_eq;

    fn episode(series_id: &str, season: i64, number: i64, name: &str) -> EpisodeRecord {
        EpisodeRecord {
            series_id: series_id.to_string(),
            season_number: season,
            episode_number: number,
            episode_name: name.to_string(),
            filename: Some(format!("S{season:02}E{number:02}.mkv")),
        }
    }

    async fn process(library: &Arc<FakeLibrary>, items: Vec<Item>) {
        let scan = scan_service(library);
        let count = items.len();
        for item in items {
            scan.enqueue(item);
        }
        scan.startup();
        wait_for(|| library.refreshes() == count).await;
        scan.stop().await;
    }

    #[tokio::test]
    async fn test_unnamed_movie_requests_metadata_once() {
        let library = Arc::new(FakeLibrary::default());
        library.add_movie("Heat (1995)", "", false, false);

        process(&library, vec![Item::movie("Heat (1995)")]).await;

        assert_eq!(*library.metadata.lock(), vec![Item::movie("Heat (1995)")]);
        assert_eq!(
            *library.events.lock(),
            vec![(EventLevel::Info, "Scanning movie: Heat (1995)".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unnamed_episode_requests_series_metadata_once() {
        let library = Arc::new(FakeLibrary::default());
        library.add_series(
            "Dark",
            "Dark",
            vec![SeasonRecord {
                season_number: 1,
                episodes: vec![episode("Dark", 1, 1, "")],
            }],
        );

        process(&library, vec![Item::series("Dark")]).await;

        assert_eq!(*library.metadata.lock(), vec![Item::series("Dark")]);
    }

    #[tokio::test]
    async fn test_named_series_with_named_episodes_requests_nothing() {
        let library = Arc::new(FakeLibrary::default());
        library.add_series(
            "Dark",
            "Dark",
            vec![SeasonRecord {
                season_number: 1,
                episodes: vec![episode("Dark", 1, 1, "Secrets")],
            }],
        );

        process(&library, vec![Item::series("Dark")]).await;

        assert!(library.metadata.lock().is_empty());
        assert_eq!(
            *library.events.lock(),
            vec![(EventLevel::Info, "Scanning series: Dark".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_movie_encode_depends_on_monitored() {
        let library = Arc::new(FakeLibrary::default());
        library.add_movie("Heat (1995)", "Heat", true, true);
        library.add_movie("Up (2009)", "Up", true, false);

        process(
            &library,
            vec![Item::movie("Heat (1995)"), Item::movie("Up (2009)")],
        )
        .await;

        assert_eq!(*library.encode.lock(), vec![Item::movie("Heat (1995)")]);
        assert!(library.metadata.lock().is_empty());
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;
    use transfigurr::db::Database;
    use transfigurr::services::{DatabaseService, HealthStatus, ServicesManager};

    #[tokio::test]
    async fn test_stopped_worker_leaves_items_queued() {
        let library = Arc::new(FakeLibrary::default());
        let scan = scan_service(&library);

        scan.startup();
        scan.startup();
        assert!(scan.is_running());
        scan.stop().await;
        assert!(!scan.is_running());

        scan.enqueue(Item::movie("Heat"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(library.scanned.lock().is_empty());
        assert_eq!(scan.queue().len(), 1);

        scan.startup();
        wait_for(|| library.refreshes() == 1).await;
        assert_eq!(*library.scanned.lock(), vec![Item::movie("Heat")]);
        scan.stop().await;
    }

    #[tokio::test]
    async fn test_stop_waits_for_item_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(FakeLibrary {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let scan = Arc::new(scan_service(&library));
        scan.startup();
        scan.enqueue(Item::movie("Heat"));
        wait_for(|| library.scanned.lock().len() == 1).await;

        let stopping = {
            let scan = scan.clone();
            tokio::spawn(async move { scan.stop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!stopping.is_finished());

        gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(1), stopping)
            .await
            .expect("stop did not return")
            .unwrap();
        assert_eq!(scan.queue().pending_len(), 0);
        assert_eq!(library.refreshes(), 1);
    }

    #[tokio::test]
    async fn test_managed_by_services_manager() {
        let library = Arc::new(FakeLibrary::default());
        let scan = Arc::new(scan_service(&library));
        let database = Arc::new(DatabaseService::new(
            Database::connect("sqlite::memory:", 1).await.unwrap(),
        ));

        let manager = ServicesManager::new();
        manager.register(scan.clone()).await;
        manager.register(database).await;
        manager.start_all().await.unwrap();

        assert!(scan.is_running());
        let health = manager.health_all().await;
        assert_eq!(health["scan"].status, HealthStatus::Healthy);
        assert_eq!(health["database"].status, HealthStatus::Healthy);

        manager.stop_all().await.unwrap();
        assert!(!scan.is_running());
        assert!(!manager.is_started("scan").await);
    }
}
