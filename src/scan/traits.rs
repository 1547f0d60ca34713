//! Collaborators consumed by the scan pipeline
//!
//! Everything the queue, dispatcher and processor touch outside their own
//! state goes through these traits, so the pipeline can be driven by the
//! SQLite repositories and filesystem tasks in production and by in-memory
//! fakes in tests.

use anyhow::Result;
use async_trait::async_trait;

use super::item::Item;
use crate::db::{MovieRecord, SeriesRecord};

/// Read access to stored movies
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn list_movies(&self) -> Result<Vec<MovieRecord>>;

    async fn get_movie(&self, id: &str) -> Result<MovieRecord>;
}

/// Read access to stored series. [get_series](SeriesStore::get_series)
/// returns the series with its seasons and episodes.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    async fn list_series(&self) -> Result<Vec<SeriesRecord>>;

    async fn get_series(&self, id: &str) -> Result<SeriesRecord>;
}

/// Entry names directly under the movie and series library roots
#[async_trait]
pub trait LibraryListing: Send + Sync {
    async fn movie_entries(&self) -> Result<Vec<String>>;

    async fn series_entries(&self) -> Result<Vec<String>>;
}

/// Filesystem-to-repository reconciliation tasks.
///
/// Each task must be idempotent for the same input.
#[async_trait]
pub trait LibraryTasks: Send + Sync {
    async fn scan_movie(&self, id: &str) -> Result<()>;

    async fn validate_movie(&self, id: &str) -> Result<()>;

    async fn scan_series(&self, id: &str) -> Result<()>;

    async fn validate_series(&self, id: &str) -> Result<()>;

    /// Refresh system-wide derived state
    async fn scan_system(&self) -> Result<()>;
}

/// Fire-and-forget request to refresh descriptive metadata
pub trait MetadataQueue: Send + Sync {
    fn enqueue(&self, item: Item);
}

/// Fire-and-forget request to schedule an encode job
pub trait EncodeQueue: Send + Sync {
    fn enqueue(&self, item: Item);
}

/// Severity of an operational event
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Debug => "DEBUG",
            EventLevel::Info => "INFO",
            EventLevel::Warn => "WARN",
            EventLevel::Error => "ERROR",
        }
    }
}

/// Operational event log. Must never fail the caller.
pub trait EventLog: Send + Sync {
    fn log(&self, level: EventLevel, source: &str, message: &str);
}
