use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Level;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RulesError {
    #[error("advance threshold must be > 0")]
    InvalidAdvanceThreshold,

    #[error("quiz unlock threshold must be > 0")]
    InvalidQuizUnlockThreshold,

    #[error("passing percentage must be in 0..=100, got {0}")]
    InvalidPassingPercentage(u8),
}

/// Thresholds that drive sublevel advancement, quiz unlocking and quiz passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionRules {
    advance_threshold: u32,
    quiz_unlock_threshold: u32,
    default_passing_percentage: u8,
}

impl Default for ProgressionRules {
    /// Four correct answers move to the next sublevel, two on the last
    /// sublevel unlock the quiz, and 70% passes a quiz.
    fn default() -> Self {
        Self {
            advance_threshold: 4,
            quiz_unlock_threshold: 2,
            default_passing_percentage: 70,
        }
    }
}

impl ProgressionRules {
    /// # Errors
    ///
    /// Returns `RulesError` if a threshold is zero or the percentage exceeds 100.
    pub fn new(
        advance_threshold: u32,
        quiz_unlock_threshold: u32,
        default_passing_percentage: u8,
    ) -> Result<Self, RulesError> {
        if advance_threshold == 0 {
            return Err(RulesError::InvalidAdvanceThreshold);
        }
        if quiz_unlock_threshold == 0 {
            return Err(RulesError::InvalidQuizUnlockThreshold);
        }
        if default_passing_percentage > 100 {
            return Err(RulesError::InvalidPassingPercentage(
                default_passing_percentage,
            ));
        }
        Ok(Self {
            advance_threshold,
            quiz_unlock_threshold,
            default_passing_percentage,
        })
    }

    #[must_use]
    pub fn advance_threshold(&self) -> u32 {
        self.advance_threshold
    }

    #[must_use]
    pub fn quiz_unlock_threshold(&self) -> u32 {
        self.quiz_unlock_threshold
    }

    #[must_use]
    pub fn default_passing_percentage(&self) -> u8 {
        self.default_passing_percentage
    }

    /// The level's own threshold, falling back to the default.
    #[must_use]
    pub fn passing_percentage_for(&self, level: &Level) -> u8 {
        level
            .min_passing_percentage()
            .unwrap_or(self.default_passing_percentage)
    }
}
