//! Scan pipeline
//!
//! A deduplicated FIFO queue of movie and series items, seeded by the
//! [Dispatcher] and drained by a single worker owned by [ScanService].

pub mod dispatcher;
pub mod item;
pub mod processor;
pub mod queue;
pub mod traits;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use item::{Item, ItemKind};
pub use processor::ItemProcessor;
pub use queue::ScanQueue;
pub use worker::{ScanCollaborators, ScanService};
