//! Shared error types for the services crate.

use thiserror::Error;

use mathquest_core::model::{LearnerError, LearnerId, LevelError};
use mathquest_core::progression::ProgressionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `Backend` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("backend is not configured")]
    Disabled,
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not decode backend content: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted by `AiOrderingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiOrderingError {
    #[error("question ordering is not configured")]
    Disabled,
    #[error("question ordering returned an empty response")]
    EmptyResponse,
    #[error("question ordering request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `LearnerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearnerServiceError {
    #[error("learner {0} is not registered")]
    UnknownLearner(LearnerId),
    #[error("learner {0} is already registered")]
    AlreadyRegistered(LearnerId),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressionServiceError {
    #[error("learner {0} is not registered")]
    UnknownLearner(LearnerId),
    #[error("another request is still in flight")]
    Busy,
    #[error("learner is not {expected}")]
    WrongActivity { expected: &'static str },
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
