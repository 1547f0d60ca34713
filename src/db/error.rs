//! Repository error type

use thiserror::Error;

/// Error returned by the SQLite repositories
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;
