mod ids;
mod learner;
mod level;
mod prompt;
mod question;

pub use ids::{LearnerId, LevelId, ParseIdError, QuestionId, SublevelId};
pub use learner::{Learner, LearnerError};
pub use level::{Curriculum, Level, LevelError, LevelRecord, Sublevel, SublevelRecord};
pub use prompt::{Prompt, PromptError};
pub use question::{
    Operation, PlacementQuestion, Question, QuestionError, QuestionKind, QuestionRecord,
    QuizQuestion, SortOrder,
};
