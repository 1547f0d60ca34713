//! Deduplicated FIFO scan queue
//!
//! Holds the pending items and the set of keys that are either queued or
//! currently owned by the worker. A key stays in the pending set from the
//! first successful [enqueue](ScanQueue::enqueue) until
//! [complete](ScanQueue::complete), so repeated requests for the same item are
//! dropped while it waits or runs.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use super::item::Item;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Item>,
    pending: HashSet<String>,
}

/// Scan queue shared between producers and the single worker.
///
/// The mutex only guards O(1) bookkeeping and is never held across an await.
#[derive(Debug, Default)]
pub struct ScanQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an item.
    ///
    /// Returns `true` if the item was appended, `false` if its key was already
    /// queued or in flight (no-op).
    pub fn enqueue(&self, item: Item) -> bool {
        let key = item.key();
        {
            let mut state = self.state.lock();
            if !state.pending.insert(key.clone()) {
                debug!(key = %key, "Scan already pending, dropping request");
                return false;
            }
            state.items.push_back(item);
        }
        self.notify.notify_one();
        debug!(key = %key, "Scan queued");
        true
    }

    /// Wait for and remove the head item.
    ///
    /// The returned item stays pending until [complete](Self::complete) is
    /// called for it. Cancel safe: an item is only removed when this returns.
    pub async fn dequeue(&self) -> Item {
        loop {
            let notified = self.notify.notified();
            if let Some(item) = self.try_dequeue() {
                return item;
            }
            notified.await;
        }
    }

    /// Remove the head item without waiting
    pub fn try_dequeue(&self) -> Option<Item> {
        self.state.lock().items.pop_front()
    }

    /// Release the item's key so it can be scheduled again
    pub fn complete(&self, item: &Item) {
        let key = item.key();
        self.state.lock().pending.remove(&key);
        debug!(key = %key, "Scan completed");
    }

    /// Whether the item is queued or in flight
    pub fn is_pending(&self, item: &Item) -> bool {
        self.state.lock().pending.contains(&item.key())
    }

    /// Number of items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys queued or in flight
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}
