//! Background work queue with bounded concurrency
//!
//! Used by collaborators that own their own scheduling (metadata refresh,
//! encode requests). Producers hand off a payload and move on; a background
//! task drains the channel and runs the processor under a semaphore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for a job queue
#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    /// Maximum concurrent jobs
    pub max_concurrent: usize,
    /// Queue capacity (pending jobs)
    pub queue_capacity: usize,
    /// Delay between processing jobs (for rate limiting)
    pub job_delay: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            queue_capacity: 500,
            job_delay: Duration::ZERO,
        }
    }
}

/// A queued job
#[derive(Debug)]
pub struct Job<T> {
    pub id: Uuid,
    pub payload: T,
}

impl<T> Job<T> {
    pub fn new(payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
        }
    }
}

/// Why a job could not be handed to the queue
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("queue '{0}' is full")]
    Full(String),
    #[error("queue '{0}' is closed")]
    Closed(String),
}

/// A bounded work queue that processes jobs with limited concurrency
pub struct WorkQueue<T> {
    sender: mpsc::Sender<Job<T>>,
    semaphore: Arc<Semaphore>,
    config: JobQueueConfig,
    name: String,
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Create a new work queue with a processor function.
    ///
    /// Must be called from within a Tokio runtime; the consumer task is
    /// spawned immediately and stops once every sender is dropped.
    pub fn new<F, Fut>(name: &str, config: JobQueueConfig, processor: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let (sender, mut receiver) = mpsc::channel::<Job<T>>(config.queue_capacity.max(1));
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        let job_delay = config.job_delay;
        let queue_name = name.to_string();

        let sem_clone = semaphore.clone();
        let processor = Arc::new(processor);

        tokio::spawn(async move {
            info!(queue = %queue_name, "Work queue started");

            while let Some(job) = receiver.recv().await {
                let permit = match sem_clone.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let proc = processor.clone();
                let name = queue_name.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    debug!(queue = %name, job_id = %job.id, "Processing job");
                    proc(job.payload).await;
                    debug!(queue = %name, job_id = %job.id, "Job completed");
                });

                if job_delay > Duration::ZERO {
                    tokio::time::sleep(job_delay).await;
                }
            }

            info!(queue = %queue_name, "Work queue stopped");
        });

        Self {
            sender,
            semaphore,
            config,
            name: name.to_string(),
        }
    }

    /// Submit a job, waiting for queue capacity
    pub async fn submit(&self, payload: T) -> Result<Uuid, SubmitError> {
        let job = Job::new(payload);
        let id = job.id;
        self.sender
            .send(job)
            .await
            .map_err(|_| SubmitError::Closed(self.name.clone()))?;
        debug!(queue = %self.name, job_id = %id, "Job submitted");
        Ok(id)
    }

    /// Submit a job without waiting. Fails if the queue is full or closed.
    pub fn try_submit(&self, payload: T) -> Result<Uuid, SubmitError> {
        let job = Job::new(payload);
        let id = job.id;
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full(self.name.clone()),
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed(self.name.clone()),
        })?;
        debug!(queue = %self.name, job_id = %id, "Job submitted");
        Ok(id)
    }

    /// Submit a job, logging instead of failing when it cannot be queued
    pub fn submit_or_warn(&self, payload: T) {
        if let Err(e) = self.try_submit(payload) {
            warn!(queue = %self.name, error = %e, "Dropping job");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current queue statistics
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            max_concurrent: self.config.max_concurrent,
            available_permits: self.semaphore.available_permits(),
            queue_capacity: self.config.queue_capacity,
            queued: self.config.queue_capacity.max(1) - self.sender.capacity(),
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub max_concurrent: usize,
    pub available_permits: usize,
    pub queue_capacity: usize,
    pub queued: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_jobs_are_processed() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let queue = WorkQueue::new("test", JobQueueConfig::default(), move |n: usize| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(n, Ordering::SeqCst);
            }
        });

        for n in 1..=4 {
            queue.submit(n).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(1), async {
            while seen.load(Ordering::SeqCst) < 10 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs not processed");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let config = JobQueueConfig {
            max_concurrent: 2,
            queue_capacity: 16,
            job_delay: Duration::ZERO,
        };
        let (r, m, d) = (running.clone(), max_seen.clone(), done.clone());
        let queue = WorkQueue::new("bounded", config, move |_: ()| {
            let (r, m, d) = (r.clone(), m.clone(), d.clone());
            async move {
                let current = r.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                r.fetch_sub(1, Ordering::SeqCst);
                d.fetch_add(1, Ordering::SeqCst);
            }
        });

        for _ in 0..8 {
            queue.submit(()).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(2), async {
            while done.load(Ordering::SeqCst) < 8 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs not processed");

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_try_submit_reports_full_queue() {
        let config = JobQueueConfig {
            max_concurrent: 1,
            queue_capacity: 1,
            job_delay: Duration::ZERO,
        };
        // Processor never finishes, so the consumer holds one job and the
        // channel fills up behind it.
        let queue = WorkQueue::new("full", config, |_: u32| std::future::pending::<()>());

        let mut full = false;
        for n in 0..8 {
            if let Err(SubmitError::Full(name)) = queue.try_submit(n) {
                assert_eq!(name, "full");
                full = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(full);
    }
}
