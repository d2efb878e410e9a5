//! Content and progress backend contract.
//!
//! The learner's device fetches levels and questions from a backend and
//! reports quiz results and progress back to it. `HttpBackend` talks to the
//! real service; `StaticBackend` serves a fixed content pack.

mod http;
mod fixture;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mathquest_core::model::{
    LearnerId, Level, LevelId, PlacementQuestion, QuestionRecord, QuizQuestion, SublevelId,
};
use mathquest_core::progression::QuizResult;

use crate::error::BackendError;

pub use fixture::{ContentPack, PracticeSet, QuizSet, StaticBackend};
pub use http::{BackendConfig, HttpBackend};

/// Body of `POST /results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub learner_id: LearnerId,
    pub level_id: LevelId,
    pub correct: u32,
    pub total: u32,
}

impl QuizSubmission {
    #[must_use]
    pub fn from_result(learner_id: LearnerId, result: &QuizResult) -> Self {
        Self {
            learner_id,
            level_id: result.level_id,
            correct: result.correct,
            total: result.total,
        }
    }
}

/// Backend acknowledgement of a submitted quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub progress_percentage: Option<u8>,
}

/// Body of `PUT /learners/{id}/progress`. The id travels in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(skip)]
    pub learner_id: LearnerId,
    pub level: u32,
    pub completed_initial_quiz: bool,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Ordered list of levels, first level first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or decoding failures.
    async fn fetch_levels(&self) -> Result<Vec<Level>, BackendError>;

    /// Raw practice questions of one sublevel. Records are validated by the caller.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or decoding failures.
    async fn fetch_practice_questions(
        &self,
        level_id: LevelId,
        sublevel_id: SublevelId,
    ) -> Result<Vec<QuestionRecord>, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` on transport or decoding failures.
    async fn fetch_quiz_questions(&self, level_id: LevelId)
    -> Result<Vec<QuizQuestion>, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` on transport or decoding failures.
    async fn fetch_placement_questions(&self) -> Result<Vec<PlacementQuestion>, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` if the backend did not accept the submission.
    async fn submit_quiz_result(
        &self,
        submission: &QuizSubmission,
    ) -> Result<SubmissionReceipt, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` if the backend did not accept the update.
    async fn update_learner_progress(&self, update: &ProgressUpdate) -> Result<(), BackendError>;
}
