//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{FilterError, GuessId, RoundId};
use storage::repository::StorageError;

/// Errors emitted by `RoundManager`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoundError {
    #[error("invalid filters: {0}")]
    InvalidFilters(#[from] FilterError),
    #[error("an active round already exists")]
    ActiveRoundExists,
    #[error("no active round")]
    NoActiveRound,
    #[error("round {0} not found")]
    RoundNotFound(RoundId),
    #[error("guess {0} not found")]
    GuessNotFound(GuessId),
    #[error("guess {0} is already finalized")]
    GuessAlreadyFinalized(GuessId),
    #[error("round {0} is completed, its guesses can no longer change")]
    RoundCompleted(RoundId),
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for RoundError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ActiveRoundExists => RoundError::ActiveRoundExists,
            StorageError::Connection(msg) => RoundError::PersistenceUnavailable(msg),
            other => RoundError::Storage(other),
        }
    }
}

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("invalid filters: {0}")]
    InvalidFilters(#[from] FilterError),
    #[error("question count must be between 1 and {max}, got {count}")]
    CountOutOfRange { count: u32, max: u32 },
    #[error("unknown verb: {0}")]
    UnknownVerb(String),
}

/// Errors emitted by `CoverageService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoverageError {
    #[error("start date is after end date")]
    InvalidDateRange,
    #[error(transparent)]
    Storage(#[from] StorageError),
}
