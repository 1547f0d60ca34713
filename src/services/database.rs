//! Database service: wraps the SQLite pool for lifecycle (start/stop/health) and dependencies.
//!
//! Services that need the database (e.g. scan) declare `dependencies: ["database"]`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::Database;
use crate::services::manager::{Service, ServiceHealth};

/// Configuration for the database service
#[derive(Debug, Clone)]
pub struct DatabaseServiceConfig {
    /// SQLite connection URL (e.g. `sqlite:./data/transfigurr.db?mode=rwc` or `sqlite::memory:`).
    pub database_url: String,
    pub max_connections: u32,
    /// How long to retry connecting before giving up.
    pub connect_timeout: Duration,
}

impl Default for DatabaseServiceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/transfigurr.db?mode=rwc".to_string(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Service that owns the database pool. Register it so that services
/// depending on `"database"` start after the schema exists.
pub struct DatabaseService {
    db: Database,
}

impl DatabaseService {
    /// Wrap an already-connected database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn from_config(config: DatabaseServiceConfig) -> Result<Self> {
        let db = Database::connect_with_retry(
            &config.database_url,
            config.max_connections,
            Duration::from_secs(1),
            config.connect_timeout,
        )
        .await
        .context("Database service: connect_with_retry failed")?;
        Ok(Self::new(db))
    }

    /// Valid until [Service::stop] is called.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Service for DatabaseService {
    fn name(&self) -> &str {
        "database"
    }

    async fn start(&self) -> Result<()> {
        info!(service = "database", "Database service starting");
        sqlx::query("SELECT 1").execute(self.db.pool()).await?;
        self.db.init_schema().await?;
        info!(service = "database", "Database service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.db.pool().close().await;
        info!(service = "database", "Database service stopped");
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        match sqlx::query("SELECT 1").execute(self.db.pool()).await {
            Ok(_) => Ok(ServiceHealth::healthy()),
            Err(e) => {
                warn!(service = "database", error = %e, "Health check failed");
                Ok(ServiceHealth::unhealthy(e.to_string()))
            }
        }
    }
}
