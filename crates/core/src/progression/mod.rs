//! Learner progression: sublevel advancement, quiz unlocking, quiz scoring,
//! level advancement and initial placement.
//!
//! Everything here is synchronous and pure over already-fetched content.

mod engine;
mod placement;
mod practice;
mod quiz;
mod rules;

use thiserror::Error;

use crate::games::GameError;
use crate::model::{LearnerError, LevelId, QuestionId};

pub use engine::{PracticeAnswer, ProgressionEngine, Stage};
pub use placement::{LevelScore, PlacementResult, PlacementSession};
pub use practice::{PracticeSession, PracticeStep};
pub use quiz::{QuizResult, QuizSession, percentage};
pub use rules::{ProgressionRules, RulesError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("quiz for level {0} is still locked")]
    QuizLocked(LevelId),

    #[error("no questions available")]
    NoContent,

    #[error("no further levels available")]
    NoFurtherContent,

    #[error("quiz is missing answers for {} question(s)", missing.len())]
    IncompleteQuiz { missing: Vec<QuestionId> },

    #[error("expected level {expected}, got {found}")]
    LevelMismatch { expected: LevelId, found: LevelId },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Learner(#[from] LearnerError),
}
