use thiserror::Error;

use crate::games::GameError;
use crate::model::{LearnerError, LevelError, QuestionError};
use crate::progression::{ProgressionError, RulesError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Rules(#[from] RulesError),
}
