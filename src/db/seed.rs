//! Default rows for a fresh database.
//!
//! Uses INSERT OR IGNORE so re-runs are idempotent and rows a user changed
//! are preserved.

use sqlx::SqlitePool;
use tracing::info;

use super::settings::SETTING_DEFAULT_PROFILE;

/// Profile assigned to new movies and series until the user picks another
pub const DEFAULT_PROFILE_ID: i64 = 1;

/// Insert the default encode profile and settings. Returns the number of rows
/// that were actually inserted.
pub async fn run_seeds(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut inserted = sqlx::query(
        "INSERT OR IGNORE INTO profiles (id, name, container, codec) VALUES (?, ?, ?, ?)",
    )
    .bind(DEFAULT_PROFILE_ID)
    .bind("Default")
    .bind("mkv")
    .bind("hevc")
    .execute(pool)
    .await?
    .rows_affected();

    inserted += sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(SETTING_DEFAULT_PROFILE)
        .bind(DEFAULT_PROFILE_ID.to_string())
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!(rows = inserted, "Seeded default profile and settings");
    }
    Ok(inserted)
}
