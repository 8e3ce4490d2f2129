// ABOUTME: Storage error type shared by every persistence operation
// ABOUTME: Separates missing rows and lost compare-and-swap races from raw database failures

use proposekit_core::{ProposalStatusV2, UnknownVariant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Guarded update lost: the row is no longer in the expected state
    #[error("Proposal {id} expected status {expected} but found {actual}")]
    Conflict {
        id: String,
        expected: ProposalStatusV2,
        actual: ProposalStatusV2,
    },

    #[error("Change request {id} is not in status {expected}")]
    ChangeRequestConflict { id: String, expected: String },

    #[error("Share id already in use: {0}")]
    DuplicateShareId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl From<UnknownVariant> for StorageError {
    fn from(err: UnknownVariant) -> Self {
        StorageError::InvalidData(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// True when the database rejected a write on a UNIQUE constraint
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
