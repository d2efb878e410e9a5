use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{PlacementQuestion, QuestionId};

use super::ProgressionError;
use super::quiz::percentage;

/// The initial placement quiz taken once, right after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementSession {
    questions: Vec<PlacementQuestion>,
    answers: BTreeMap<QuestionId, String>,
}

/// Score of the placement questions that probe one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelScore {
    pub level: u32,
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementResult {
    /// 1-based level the learner starts practicing at.
    pub level: u32,
    pub scores: Vec<LevelScore>,
}

impl PlacementSession {
    pub(crate) fn new(questions: Vec<PlacementQuestion>) -> Self {
        Self {
            questions,
            answers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn questions(&self) -> &[PlacementQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn next_unanswered(&self) -> Option<&PlacementQuestion> {
        self.questions
            .iter()
            .find(|q| !self.answers.contains_key(&q.question.id))
    }

    #[must_use]
    pub fn missing(&self) -> Vec<QuestionId> {
        self.questions
            .iter()
            .map(|q| q.question.id)
            .filter(|id| !self.answers.contains_key(id))
            .collect()
    }

    pub(crate) fn record(
        &mut self,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<(), ProgressionError> {
        if !self.questions.iter().any(|q| q.question.id == question_id) {
            return Err(ProgressionError::UnknownQuestion(question_id));
        }
        self.answers.insert(question_id, answer.into());
        Ok(())
    }

    /// Per-level scores, ascending by level.
    pub(crate) fn scores(&self) -> Vec<LevelScore> {
        let mut tally: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
        for q in &self.questions {
            let entry = tally.entry(q.level).or_default();
            entry.1 += 1;
            let answered_correctly = self
                .answers
                .get(&q.question.id)
                .is_some_and(|a| q.question.is_correct(a));
            if answered_correctly {
                entry.0 += 1;
            }
        }
        tally
            .into_iter()
            .map(|(level, (correct, total))| LevelScore {
                level,
                correct,
                total,
                percentage: percentage(correct, total),
            })
            .collect()
    }
}

/// Place the learner one above the highest level passed without a gap.
///
/// Levels are checked in ascending order; the first level below
/// `passing_percentage` stops the climb.
pub(crate) fn place(scores: &[LevelScore], passing_percentage: u8) -> u32 {
    let mut placed = 1;
    for score in scores {
        if score.percentage < passing_percentage {
            break;
        }
        placed = placed.max(score.level.saturating_add(1));
    }
    placed
}
