use thiserror::Error;

use crate::storage::StoreError;

/// Errors surfaced by the engine and the `TrainingService` facade.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested exercise kind has no entry in the catalog.
    #[error("exercise config not found: {0}")]
    ConfigNotFound(String),

    /// The session id is unknown, already finalized, or the operation does
    /// not apply to the session's current phase.
    #[error("invalid session state: {0}")]
    InvalidSessionState(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
