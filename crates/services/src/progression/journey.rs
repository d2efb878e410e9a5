use mathquest_core::model::{Learner, Level};
use mathquest_core::progression::{
    PlacementSession, PracticeSession, ProgressionEngine, QuizSession, Stage,
};

/// What the learner is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// One-time placement quiz right after registration.
    Placement(PlacementSession),
    Practice(PracticeSession),
    /// Level quiz; the practice session is kept to return to on abandon.
    Quiz {
        quiz: QuizSession,
        practice: PracticeSession,
    },
    /// Past the last level of the curriculum.
    Complete,
}

impl Activity {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Placement(_) => "placing",
            Self::Practice(_) => "practicing",
            Self::Quiz { .. } => "taking a quiz",
            Self::Complete => "finished",
        }
    }
}

impl From<Stage> for Activity {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Practicing(session) => Self::Practice(session),
            Stage::Complete => Self::Complete,
        }
    }
}

/// A learner's in-memory progress through one app session.
///
/// Owned by the caller and passed to `ProgressionService` by `&mut`, so a
/// journey only changes through service calls. Dropping it abandons any
/// open practice or quiz without side effects.
#[derive(Debug, Clone)]
pub struct LearnerJourney {
    pub(crate) learner: Learner,
    pub(crate) engine: ProgressionEngine,
    pub(crate) activity: Activity,
}

impl LearnerJourney {
    #[must_use]
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    #[must_use]
    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    #[must_use]
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// The level being worked on, `None` once the curriculum is finished.
    #[must_use]
    pub fn current_level(&self) -> Option<&Level> {
        self.engine.current_level(&self.learner)
    }

    #[must_use]
    pub fn practice(&self) -> Option<&PracticeSession> {
        match &self.activity {
            Activity::Practice(session) => Some(session),
            _ => None,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizSession> {
        match &self.activity {
            Activity::Quiz { quiz, .. } => Some(quiz),
            _ => None,
        }
    }

    #[must_use]
    pub fn placement(&self) -> Option<&PlacementSession> {
        match &self.activity {
            Activity::Placement(session) => Some(session),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.activity, Activity::Complete)
    }
}
