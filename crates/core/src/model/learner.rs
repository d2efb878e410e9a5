use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LearnerId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("learner name cannot be empty")]
    EmptyName,

    #[error("learner level must be >= 1, got {0}")]
    InvalidLevel(u32),

    #[error("initial placement quiz already completed")]
    AlreadyPlaced,
}

//
// ─── LEARNER ───────────────────────────────────────────────────────────────────
//

/// A child working through the curriculum.
///
/// Identity fields are owned by the auth collaborator. `level` and
/// `completed_initial_quiz` only change through the progression engine:
/// once through placement, then by `+1` per passed level quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    id: LearnerId,
    name: String,
    level: u32,
    completed_initial_quiz: bool,
    is_admin: bool,
}

impl Learner {
    /// Registers a new learner at level 1 who has not yet taken placement.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError::EmptyName` if the name is blank.
    pub fn new(id: LearnerId, name: impl Into<String>) -> Result<Self, LearnerError> {
        Self::from_persisted(id, name, 1, false, false)
    }

    /// Rehydrate a learner from storage or the backend.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError` if the name is blank or the level is zero.
    pub fn from_persisted(
        id: LearnerId,
        name: impl Into<String>,
        level: u32,
        completed_initial_quiz: bool,
        is_admin: bool,
    ) -> Result<Self, LearnerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LearnerError::EmptyName);
        }
        if level == 0 {
            return Err(LearnerError::InvalidLevel(level));
        }
        Ok(Self {
            id,
            name: name.trim().to_owned(),
            level,
            completed_initial_quiz,
            is_admin,
        })
    }

    #[must_use]
    pub fn id(&self) -> LearnerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn completed_initial_quiz(&self) -> bool {
        self.completed_initial_quiz
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Moves the learner up exactly one level.
    pub(crate) fn advance_level(&mut self) {
        self.level = self.level.saturating_add(1);
    }

    /// Records the placement outcome. Only allowed once.
    pub(crate) fn complete_placement(&mut self, level: u32) -> Result<(), LearnerError> {
        if self.completed_initial_quiz {
            return Err(LearnerError::AlreadyPlaced);
        }
        if level == 0 {
            return Err(LearnerError::InvalidLevel(level));
        }
        self.level = self.level.max(level);
        self.completed_initial_quiz = true;
        Ok(())
    }
}
