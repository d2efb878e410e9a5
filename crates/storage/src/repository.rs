use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mathquest_core::model::{Learner, LearnerId, LevelId};
use mathquest_core::progression::QuizResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A scored quiz as kept on this device.
///
/// `synced` stays false until the backend acknowledged the submission, so a
/// failed upload can be retried later without rescoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttemptRecord {
    pub learner_id: LearnerId,
    pub level_id: LevelId,
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
    pub passed: bool,
    pub recorded_at: DateTime<Utc>,
    pub synced: bool,
}

impl QuizAttemptRecord {
    #[must_use]
    pub fn from_result(learner_id: LearnerId, result: &QuizResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            level_id: result.level_id,
            correct: result.correct,
            total: result.total,
            percentage: result.percentage,
            passed: result.passed,
            recorded_at,
            synced: false,
        }
    }
}

/// Persisted attempt with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttemptRow {
    pub id: i64,
    pub attempt: QuizAttemptRecord,
}

/// Explicit load/save boundary for the learner's own state.
#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// Fetch a learner by ID. `Ok(None)` when unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError>;

    /// Persist or update a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the learner cannot be stored.
    async fn save_learner(&self, learner: &Learner) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Append a scored attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_result(&self, attempt: &QuizAttemptRecord) -> Result<i64, StorageError>;

    /// Most recent attempts for a learner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_results(
        &self,
        learner_id: LearnerId,
        limit: u32,
    ) -> Result<Vec<QuizAttemptRow>, StorageError>;

    /// Attempts the backend has not acknowledged yet, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_unsynced(&self, learner_id: LearnerId) -> Result<Vec<QuizAttemptRow>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no attempt has this id.
    async fn mark_synced(&self, id: i64) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    learners: Arc<Mutex<HashMap<LearnerId, Learner>>>,
    results: Arc<Mutex<Vec<QuizAttemptRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl LearnerRepository for InMemoryRepository {
    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError> {
        let guard = self.learners.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn save_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        let mut guard = self.learners.lock().map_err(poisoned)?;
        guard.insert(learner.id(), learner.clone());
        Ok(())
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, attempt: &QuizAttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?;
        guard.push(QuizAttemptRow {
            id,
            attempt: attempt.clone(),
        });
        Ok(id)
    }

    async fn list_results(
        &self,
        learner_id: LearnerId,
        limit: u32,
    ) -> Result<Vec<QuizAttemptRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .iter()
            .rev()
            .filter(|row| row.attempt.learner_id == learner_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_unsynced(&self, learner_id: LearnerId) -> Result<Vec<QuizAttemptRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|row| row.attempt.learner_id == learner_id && !row.attempt.synced)
            .cloned()
            .collect())
    }

    async fn mark_synced(&self, id: i64) -> Result<(), StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let row = guard
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StorageError::NotFound)?;
        row.attempt.synced = true;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub learners: Arc<dyn LearnerRepository>,
    pub results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let learners: Arc<dyn LearnerRepository> = Arc::new(repo.clone());
        let results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Self { learners, results }
    }
}
