//! Long-running services and their building blocks

pub mod database;
pub mod events;
pub mod filename_parser;
pub mod filesystem;
pub mod job_queue;
pub mod manager;
pub mod metadata;
pub mod queues;

pub use database::{DatabaseService, DatabaseServiceConfig};
pub use events::{EventService, LogEvent};
pub use filesystem::LibraryDirectories;
pub use job_queue::{JobQueueConfig, WorkQueue};
pub use manager::{HealthStatus, Service, ServiceHealth, ServicesManager};
pub use metadata::LocalMetadataProvider;
pub use queues::{EncodeService, MetadataService, encode_queue_config, metadata_queue_config};
