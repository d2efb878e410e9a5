use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{LevelId, QuestionId, QuizQuestion};

use super::ProgressionError;

/// A level quiz in progress. Answers are stored, not judged, until scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    level_id: LevelId,
    questions: Vec<QuizQuestion>,
    answers: BTreeMap<QuestionId, String>,
}

impl QuizSession {
    pub(crate) fn new(level_id: LevelId, questions: Vec<QuizQuestion>) -> Self {
        Self {
            level_id,
            questions,
            answers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn level_id(&self) -> LevelId {
        self.level_id
    }

    /// Always true: a quiz session never gives per-question feedback.
    #[must_use]
    pub fn quiz_mode(&self) -> bool {
        true
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Fixed size of the quiz, independent of how many were answered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn answer(&self, id: QuestionId) -> Option<&str> {
        self.answers.get(&id).map(String::as_str)
    }

    /// Ids of questions still without an answer, in quiz order.
    #[must_use]
    pub fn missing(&self) -> Vec<QuestionId> {
        self.questions
            .iter()
            .map(|q| q.id)
            .filter(|id| !self.answers.contains_key(id))
            .collect()
    }

    /// Every question has an answer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Next unanswered question, in quiz order.
    #[must_use]
    pub fn next_unanswered(&self) -> Option<&QuizQuestion> {
        self.questions
            .iter()
            .find(|q| !self.answers.contains_key(&q.id))
    }

    pub(crate) fn record(
        &mut self,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<(), ProgressionError> {
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(ProgressionError::UnknownQuestion(question_id));
        }
        self.answers.insert(question_id, answer.into());
        Ok(())
    }

    pub(crate) fn correct_count(&self) -> u32 {
        let correct = self
            .questions
            .iter()
            .filter(|q| self.answer(q.id).is_some_and(|a| q.is_correct(a)))
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }
}

/// Immutable outcome of a scored quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub level_id: LevelId,
    pub total: u32,
    pub correct: u32,
    pub percentage: u8,
    pub passed: bool,
}

impl QuizResult {
    /// Score `correct` out of `total` against `passing_percentage`.
    ///
    /// An empty quiz scores 0% and never passes.
    #[must_use]
    pub fn compute(level_id: LevelId, correct: u32, total: u32, passing_percentage: u8) -> Self {
        let correct = correct.min(total);
        let percentage = percentage(correct, total);
        Self {
            level_id,
            total,
            correct,
            percentage,
            passed: total > 0 && percentage >= passing_percentage,
        }
    }
}

/// `round(100 * correct / total)`, half rounding up, in integer arithmetic.
#[must_use]
pub fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}
