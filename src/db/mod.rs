//! Database connection and repositories
//!
//! SQLite-backed storage for movies, series (with seasons and episodes) and
//! system status values.

pub mod error;
pub mod movies;
pub mod profiles;
pub mod seed;
pub mod series;
pub mod settings;
pub mod system;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub use error::{RepoResult, RepositoryError};
pub use movies::{MovieRecord, MovieRepository, UpsertMovie};
pub use profiles::{ProfileRecord, ProfileRepository};
pub use series::{EpisodeRecord, SeasonRecord, SeriesRecord, SeriesRepository};
pub use settings::{SETTING_DEFAULT_PROFILE, SettingsRepository};
pub use system::SystemRepository;

/// Table definitions, applied in order by [Database::init_schema]
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS movies (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        path TEXT,
        filename TEXT,
        missing INTEGER NOT NULL DEFAULT 0,
        monitored INTEGER NOT NULL DEFAULT 1,
        profile_id INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS series (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        path TEXT,
        monitored INTEGER NOT NULL DEFAULT 1,
        profile_id INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS seasons (
        series_id TEXT NOT NULL,
        season_number INTEGER NOT NULL,
        PRIMARY KEY (series_id, season_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS episodes (
        series_id TEXT NOT NULL,
        season_number INTEGER NOT NULL,
        episode_number INTEGER NOT NULL,
        episode_name TEXT NOT NULL DEFAULT '',
        filename TEXT,
        PRIMARY KEY (series_id, season_number, episode_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id INTEGER PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        container TEXT NOT NULL,
        codec TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS system (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
];

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new database connection pool.
    ///
    /// In-memory databases are per connection, so `sqlite::memory:` should be
    /// opened with `max_connections = 1`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        Ok(Self { pool })
    }

    /// Connect, retrying every `retry_interval` until `timeout` has elapsed
    pub async fn connect_with_retry(
        url: &str,
        max_connections: u32,
        retry_interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match Self::connect(url, max_connections).await {
                Ok(db) => return Ok(db),
                Err(e) if tokio::time::Instant::now() + retry_interval < deadline => {
                    warn!(
                        error = %e,
                        retry_in_ms = retry_interval.as_millis() as u64,
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Create all tables that do not exist yet, then insert the default
    /// profile and settings where missing
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply schema")?;
        }
        debug!(tables = SCHEMA.len(), "Database schema ready");

        seed::run_seeds(&self.pool)
            .await
            .context("Failed to seed default rows")?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a movies repository
    pub fn movies(&self) -> MovieRepository {
        MovieRepository::new(self.pool.clone())
    }

    /// Get a series repository
    pub fn series(&self) -> SeriesRepository {
        SeriesRepository::new(self.pool.clone())
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Get a system status repository
    pub fn system(&self) -> SystemRepository {
        SystemRepository::new(self.pool.clone())
    }
}
