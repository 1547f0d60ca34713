//! Transfigurr backend entry point

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transfigurr::config::Config;
use transfigurr::scan::{ScanCollaborators, ScanService};
use transfigurr::services::{
    DatabaseService, DatabaseServiceConfig, EncodeService, EventService, LibraryDirectories,
    LocalMetadataProvider, MetadataService, Service, ServicesManager, encode_queue_config,
    metadata_queue_config,
};
use transfigurr::tasks::FsLibraryTasks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transfigurr=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting Transfigurr backend");
    tracing::info!(
        movies = %config.movies_path.display(),
        series = %config.series_path.display(),
        "Configuration loaded"
    );

    let database = Arc::new(
        DatabaseService::from_config(DatabaseServiceConfig {
            database_url: config.database_url.clone(),
            max_connections: config.database_max_connections,
            ..Default::default()
        })
        .await?,
    );
    let db = database.database().clone();
    tracing::info!("Database connected");

    let events = Arc::new(EventService::default());
    let metadata = Arc::new(MetadataService::new(
        Arc::new(LocalMetadataProvider::new(db.clone())),
        metadata_queue_config(config.metadata_queue_capacity),
    ));
    let encode = Arc::new(EncodeService::new(
        events.clone(),
        encode_queue_config(config.encode_queue_capacity),
    ));

    let dirs = LibraryDirectories::new(&config.movies_path, &config.series_path);
    let scan = Arc::new(ScanService::new(ScanCollaborators {
        movies: Arc::new(db.movies()),
        series: Arc::new(db.series()),
        listing: Arc::new(dirs.clone()),
        tasks: Arc::new(FsLibraryTasks::new(
            dirs,
            db,
            encode.clone(),
            config.default_monitored,
        )),
        metadata,
        encode,
        events,
    }));

    let services = ServicesManager::new();
    services.register(database).await;
    services.register(scan.clone()).await;
    services.start_all().await?;

    if config.scan_on_startup {
        let queued = scan.enqueue_all().await;
        tracing::info!(queued, "Initial library scan queued");
    }

    let health = services.health_all().await;
    tracing::info!(health = %serde_json::to_string(&health)?, "Services started");

    tokio::signal::ctrl_c().await?;
    tracing::info!(service = %scan.name(), "Shutdown requested");
    services.stop_all().await?;

    Ok(())
}
