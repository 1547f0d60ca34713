//! Event service: operational events for the UI and log pipeline.
//!
//! Every event is written through [tracing] at the matching level and
//! broadcast as a [LogEvent] to whoever subscribed (e.g. a websocket feed).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::scan::traits::{EventLevel, EventLog};

/// Event broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub level: EventLevel,
    pub source: String,
    pub message: String,
}

/// Event log backed by tracing and a broadcast channel
#[derive(Debug, Clone)]
pub struct EventService {
    broadcast_tx: broadcast::Sender<LogEvent>,
}

impl EventService {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self { broadcast_tx }
    }

    /// Subscribe to events logged from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.broadcast_tx.subscribe()
    }
}

impl Default for EventService {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventLog for EventService {
    fn log(&self, level: EventLevel, source: &str, message: &str) {
        match level {
            EventLevel::Debug => tracing::debug!(source = %source, "{}", message),
            EventLevel::Info => tracing::info!(source = %source, "{}", message),
            EventLevel::Warn => tracing::warn!(source = %source, "{}", message),
            EventLevel::Error => tracing::error!(source = %source, "{}", message),
        }

        let timestamp = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();

        // No subscribers is not an error
        let _ = self.broadcast_tx.send(LogEvent {
            timestamp,
            level,
            source: source.to_string(),
            message: message.to_string(),
        });
    }
}
