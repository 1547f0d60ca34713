//! Metadata and encode work queues
//!
//! The scan pipeline hands items to these queues and never waits for them;
//! each queue drains on its own background task.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::job_queue::{JobQueueConfig, QueueStats, WorkQueue};
use super::metadata::LocalMetadataProvider;
use crate::scan::item::Item;
use crate::scan::traits::{EncodeQueue, EventLevel, EventLog, MetadataQueue};

/// Configuration for the metadata queue
pub fn metadata_queue_config(queue_capacity: usize) -> JobQueueConfig {
    JobQueueConfig {
        max_concurrent: 2,
        queue_capacity,
        job_delay: Duration::from_millis(50),
    }
}

/// Configuration for the encode queue
pub fn encode_queue_config(queue_capacity: usize) -> JobQueueConfig {
    JobQueueConfig {
        max_concurrent: 1,
        queue_capacity,
        job_delay: Duration::ZERO,
    }
}

/// Metadata refresh requests, processed by a [LocalMetadataProvider]
pub struct MetadataService {
    queue: WorkQueue<Item>,
}

impl MetadataService {
    pub fn new(provider: Arc<LocalMetadataProvider>, config: JobQueueConfig) -> Self {
        let queue = WorkQueue::new("metadata", config, move |item: Item| {
            let provider = provider.clone();
            async move {
                if let Err(e) = provider.refresh(&item).await {
                    error!(item = %item, error = %e, "Metadata refresh failed");
                }
            }
        });
        Self { queue }
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

impl MetadataQueue for MetadataService {
    fn enqueue(&self, item: Item) {
        self.queue.submit_or_warn(item);
    }
}

/// Encode requests. Running the encode itself happens elsewhere; this queue
/// records each request as an event.
pub struct EncodeService {
    queue: WorkQueue<Item>,
}

impl EncodeService {
    pub fn new(events: Arc<dyn EventLog>, config: JobQueueConfig) -> Self {
        let queue = WorkQueue::new("encode", config, move |item: Item| {
            let events = events.clone();
            async move {
                info!(item = %item, "Encode requested");
                events.log(
                    EventLevel::Info,
                    "encode",
                    &format!("Encode requested for {}: {}", item.kind, item.id),
                );
            }
        });
        Self { queue }
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

impl EncodeQueue for EncodeService {
    fn enqueue(&self, item: Item) {
        self.queue.submit_or_warn(item);
    }
}
