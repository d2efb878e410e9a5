use std::collections::BTreeMap;

use crate::model::{Level, LevelId, Question, QuestionId, SublevelId};

use super::ProgressionError;
use super::rules::ProgressionRules;

/// What happened after an answer was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeStep {
    /// Stay on the current sublevel.
    Continue,
    /// Moved on; counters are back at zero and a new question set is needed.
    AdvancedSublevel { from: usize, to: usize },
    /// The last sublevel reached the unlock threshold. The quiz is not started.
    QuizUnlocked,
}

/// In-memory practice state for one learner on one level.
///
/// Never persisted: abandoning practice mid-sublevel simply drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeSession {
    level_id: LevelId,
    sublevels: Vec<SublevelId>,
    sublevel_index: usize,
    questions: Vec<Question>,
    outcomes: BTreeMap<QuestionId, bool>,
    correct_answers_count: u32,
    total_answered: u32,
    quiz_unlocked: bool,
}

impl PracticeSession {
    /// Fresh practice at the first sublevel of `level`.
    pub(crate) fn start(level: &Level) -> Self {
        Self {
            level_id: level.id(),
            sublevels: level.sublevels().iter().map(|s| s.id).collect(),
            sublevel_index: 0,
            questions: Vec::new(),
            outcomes: BTreeMap::new(),
            correct_answers_count: 0,
            total_answered: 0,
            quiz_unlocked: false,
        }
    }

    /// Practice back on the last sublevel with the quiz still available, after a failed quiz.
    pub(crate) fn resume_unlocked(level: &Level) -> Self {
        Self {
            sublevel_index: level.last_sublevel_index(),
            quiz_unlocked: true,
            ..Self::start(level)
        }
    }

    #[must_use]
    pub fn level_id(&self) -> LevelId {
        self.level_id
    }

    /// 0-based index of the current sublevel.
    #[must_use]
    pub fn sublevel_index(&self) -> usize {
        self.sublevel_index
    }

    #[must_use]
    pub fn sublevel_id(&self) -> Option<SublevelId> {
        self.sublevels.get(self.sublevel_index).copied()
    }

    #[must_use]
    pub fn sublevel_count(&self) -> usize {
        self.sublevels.len()
    }

    #[must_use]
    pub fn is_last_sublevel(&self) -> bool {
        self.sublevel_index + 1 >= self.sublevels.len()
    }

    #[must_use]
    pub fn correct_answers_count(&self) -> u32 {
        self.correct_answers_count
    }

    #[must_use]
    pub fn total_answered(&self) -> u32 {
        self.total_answered
    }

    #[must_use]
    pub fn quiz_unlocked(&self) -> bool {
        self.quiz_unlocked
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Latest outcome for a question in the current sublevel, if answered.
    #[must_use]
    pub fn outcome(&self, id: QuestionId) -> Option<bool> {
        self.outcomes.get(&id).copied()
    }

    /// True after a sublevel transition until the next question set is loaded.
    #[must_use]
    pub fn needs_questions(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question to present next. Questions repeat in order once all were shown.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.questions.is_empty() {
            return None;
        }
        let index = usize::try_from(self.total_answered).unwrap_or(0) % self.questions.len();
        self.questions.get(index)
    }

    /// Replace the question set for the current sublevel.
    ///
    /// Counters are untouched; only outcomes of the previous set are dropped.
    pub fn load_questions(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.outcomes.clear();
    }

    pub(crate) fn record(
        &mut self,
        rules: &ProgressionRules,
        question_id: QuestionId,
        is_correct: bool,
    ) -> Result<PracticeStep, ProgressionError> {
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(ProgressionError::UnknownQuestion(question_id));
        }

        self.outcomes.insert(question_id, is_correct);
        self.total_answered = self.total_answered.saturating_add(1);
        if is_correct {
            self.correct_answers_count = self.correct_answers_count.saturating_add(1);
        }

        if self.is_last_sublevel() {
            if !self.quiz_unlocked && self.correct_answers_count >= rules.quiz_unlock_threshold() {
                self.quiz_unlocked = true;
                return Ok(PracticeStep::QuizUnlocked);
            }
            return Ok(PracticeStep::Continue);
        }

        if self.correct_answers_count >= rules.advance_threshold() {
            let from = self.sublevel_index;
            self.sublevel_index += 1;
            self.correct_answers_count = 0;
            self.total_answered = 0;
            self.questions.clear();
            self.outcomes.clear();
            return Ok(PracticeStep::AdvancedSublevel {
                from,
                to: self.sublevel_index,
            });
        }

        Ok(PracticeStep::Continue)
    }
}
