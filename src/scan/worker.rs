//! Scan worker and the service facade around it
//!
//! [ScanService] owns the queue, the dispatcher and the single background
//! worker. Producers call [enqueue](ScanService::enqueue) or one of the
//! dispatch methods from anywhere; the worker processes one item at a time
//! in arrival order.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::Dispatcher;
use super::item::Item;
use super::processor::ItemProcessor;
use super::queue::ScanQueue;
use super::traits::{
    EncodeQueue, EventLog, LibraryListing, LibraryTasks, MetadataQueue, MovieStore, SeriesStore,
};
use crate::services::manager::{Service, ServiceHealth};

/// Everything the scan pipeline talks to
#[derive(Clone)]
pub struct ScanCollaborators {
    pub movies: Arc<dyn MovieStore>,
    pub series: Arc<dyn SeriesStore>,
    pub listing: Arc<dyn LibraryListing>,
    pub tasks: Arc<dyn LibraryTasks>,
    pub metadata: Arc<dyn MetadataQueue>,
    pub encode: Arc<dyn EncodeQueue>,
    pub events: Arc<dyn EventLog>,
}

struct RunningWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ScanService {
    queue: Arc<ScanQueue>,
    dispatcher: Dispatcher,
    processor: ItemProcessor,
    worker: Mutex<Option<RunningWorker>>,
}

impl ScanService {
    pub fn new(collaborators: ScanCollaborators) -> Self {
        let queue = Arc::new(ScanQueue::new());
        let dispatcher = Dispatcher::new(
            queue.clone(),
            collaborators.listing,
            collaborators.movies.clone(),
            collaborators.series.clone(),
        );
        let processor = ItemProcessor::new(
            collaborators.movies,
            collaborators.series,
            collaborators.tasks,
            collaborators.metadata,
            collaborators.encode,
            collaborators.events,
        );

        Self {
            queue,
            dispatcher,
            processor,
            worker: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> &Arc<ScanQueue> {
        &self.queue
    }

    /// Schedule one item. Returns `false` if it is already queued or being
    /// processed, in which case the request is dropped.
    pub fn enqueue(&self, item: Item) -> bool {
        self.queue.enqueue(item)
    }

    pub async fn enqueue_all_movies(&self) -> usize {
        self.dispatcher.enqueue_all_movies().await
    }

    pub async fn enqueue_all_series(&self) -> usize {
        self.dispatcher.enqueue_all_series().await
    }

    pub async fn enqueue_all(&self) -> usize {
        self.dispatcher.enqueue_all().await
    }

    /// Spawn the worker and return immediately. No-op if it is already running.
    pub fn startup(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            debug!(service = "scan", "Scan worker already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(
            self.queue.clone(),
            self.processor.clone(),
            cancel.clone(),
        ));
        *worker = Some(RunningWorker { cancel, handle });
        info!(service = "scan", "Scan worker started");
    }

    /// Signal the worker to stop and wait for it. An item being processed is
    /// finished and completed first.
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return;
        };

        worker.cancel.cancel();
        if let Err(e) = worker.handle.await {
            error!(service = "scan", error = %e, "Scan worker terminated abnormally");
        }
        info!(service = "scan", "Scan worker stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }
}

async fn run_worker(queue: Arc<ScanQueue>, processor: ItemProcessor, cancel: CancellationToken) {
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = queue.dequeue() => item,
        };

        debug!(item = %item, "Processing scan item");
        if let Err(e) = processor.process(&item).await {
            error!(item_id = %item.id, kind = %item.kind, error = %e, "Scan item failed");
        }
        queue.complete(&item);

        if let Err(e) = processor.refresh_system().await {
            warn!(error = %e, "System status refresh failed");
        }
    }
}

#[async_trait]
impl Service for ScanService {
    fn name(&self) -> &str {
        "scan"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["database".to_string()]
    }

    async fn start(&self) -> Result<()> {
        self.startup();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        ScanService::stop(self).await;
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        if !self.is_running() {
            return Ok(ServiceHealth::unhealthy("Scan worker is not running"));
        }
        Ok(ServiceHealth::healthy())
    }
}
