// ABOUTME: Error taxonomy surfaced by engine operations
// ABOUTME: Maps storage failures onto NotFound, Conflict and Storage

use proposekit_core::ValidationErrors;
use proposekit_storage::StorageError;
use thiserror::Error;

use crate::content::GenerationError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// A concurrent caller changed the record first; re-fetch and retry
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => EngineError::NotFound(id),
            StorageError::Conflict { .. } | StorageError::ChangeRequestConflict { .. } => {
                EngineError::Conflict(err.to_string())
            }
            other => EngineError::Storage(other),
        }
    }
}

impl From<GenerationError> for EngineError {
    fn from(err: GenerationError) -> Self {
        EngineError::GenerationFailed(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use proposekit_core::ProposalStatusV2;

    #[test]
    fn test_storage_errors_map_onto_taxonomy() {
        let conflict = StorageError::Conflict {
            id: "p1".to_string(),
            expected: ProposalStatusV2::AwaitingDeposit,
            actual: ProposalStatusV2::Paid,
        };
        assert!(matches!(EngineError::from(conflict), EngineError::Conflict(_)));
        assert!(matches!(
            EngineError::from(StorageError::NotFound("p1".to_string())),
            EngineError::NotFound(_)
        ));
        assert!(matches!(
            EngineError::from(StorageError::InvalidData("bad".to_string())),
            EngineError::Storage(_)
        ));
        assert!(matches!(
            EngineError::from(GenerationError::Timeout(30)),
            EngineError::GenerationFailed(_)
        ));
    }
}
