//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,

    /// Connection pool size
    pub database_max_connections: u32,

    /// Movie library root; one folder per movie
    pub movies_path: PathBuf,

    /// Series library root; one folder per series
    pub series_path: PathBuf,

    pub metadata_queue_capacity: usize,

    pub encode_queue_capacity: usize,

    /// Enqueue the whole library once the services are up
    pub scan_on_startup: bool,

    /// Monitored flag for newly discovered movies and series
    pub default_monitored: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./data/transfigurr.db?mode=rwc".to_string()),

            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,

            movies_path: lookup("MOVIES_PATH")
                .unwrap_or_else(|| "./data/movies".to_string())
                .into(),

            series_path: lookup("SERIES_PATH")
                .unwrap_or_else(|| "./data/series".to_string())
                .into(),

            metadata_queue_capacity: parse_or(&lookup, "METADATA_QUEUE_CAPACITY", 500)?,

            encode_queue_capacity: parse_or(&lookup, "ENCODE_QUEUE_CAPACITY", 500)?,

            scan_on_startup: lookup("SCAN_ON_STARTUP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),

            default_monitored: lookup("DEFAULT_MONITORED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {value:?}")),
        None => Ok(default),
    }
}
