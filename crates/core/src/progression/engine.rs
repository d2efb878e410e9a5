use crate::games::{self, Arrangement};
use crate::model::{
    Curriculum, Learner, LearnerError, Level, PlacementQuestion, QuestionId, QuizQuestion,
};

use super::ProgressionError;
use super::placement::{self, PlacementResult, PlacementSession};
use super::practice::{PracticeSession, PracticeStep};
use super::quiz::{QuizResult, QuizSession};
use super::rules::ProgressionRules;

/// Where the learner stands once a transition has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Practicing(PracticeSession),
    /// The learner is past the last level of the curriculum.
    Complete,
}

/// A judged practice answer and the transition it caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeAnswer {
    pub correct: bool,
    pub step: PracticeStep,
}

/// Decision rules for moving a learner through levels, sublevels and quizzes.
///
/// Holds no learner state of its own: sessions and the learner are passed in
/// and mutated explicitly.
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    rules: ProgressionRules,
    curriculum: Curriculum,
}

impl ProgressionEngine {
    #[must_use]
    pub fn new(rules: ProgressionRules, curriculum: Curriculum) -> Self {
        Self { rules, curriculum }
    }

    #[must_use]
    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    /// The level the learner is currently working on.
    #[must_use]
    pub fn current_level(&self, learner: &Learner) -> Option<&Level> {
        self.curriculum.level_number(learner.level())
    }

    /// Initial state: first sublevel of the learner's level, or `Complete`.
    #[must_use]
    pub fn begin(&self, learner: &Learner) -> Stage {
        match self.current_level(learner) {
            Some(level) => Stage::Practicing(PracticeSession::start(level)),
            None => Stage::Complete,
        }
    }

    /// Record an already-judged practice answer and apply the transition rule.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::UnknownQuestion` if the question is not in the
    /// current sublevel's set. The session is unchanged in that case.
    pub fn record_practice_answer(
        &self,
        session: &mut PracticeSession,
        question_id: QuestionId,
        is_correct: bool,
    ) -> Result<PracticeStep, ProgressionError> {
        session.record(&self.rules, question_id, is_correct)
    }

    /// Judge an arrangement against its question, then record the outcome.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::UnknownQuestion` for a foreign question and
    /// `ProgressionError::Game` if the arrangement belongs to another game.
    pub fn answer_practice(
        &self,
        session: &mut PracticeSession,
        question_id: QuestionId,
        arrangement: &Arrangement,
    ) -> Result<PracticeAnswer, ProgressionError> {
        let question = session
            .questions()
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(ProgressionError::UnknownQuestion(question_id))?;
        let correct = games::evaluate(&question.kind, arrangement)?;
        let step = self.record_practice_answer(session, question_id, correct)?;
        Ok(PracticeAnswer { correct, step })
    }

    /// Open the level quiz with its fixed question set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::QuizLocked` until practice unlocked the quiz and
    /// `ProgressionError::NoContent` for an empty question set.
    pub fn start_quiz(
        &self,
        practice: &PracticeSession,
        questions: Vec<QuizQuestion>,
    ) -> Result<QuizSession, ProgressionError> {
        if !practice.quiz_unlocked() {
            return Err(ProgressionError::QuizLocked(practice.level_id()));
        }
        if questions.is_empty() {
            return Err(ProgressionError::NoContent);
        }
        Ok(QuizSession::new(practice.level_id(), questions))
    }

    /// Store an answer for later scoring. No feedback is produced.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::UnknownQuestion` if the question is not in the quiz.
    pub fn record_quiz_answer(
        &self,
        session: &mut QuizSession,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<(), ProgressionError> {
        session.record(question_id, answer)
    }

    /// Score a completed quiz over its full question set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::IncompleteQuiz` while answers are missing and
    /// `ProgressionError::LevelMismatch` if `level` is not the quiz's level.
    pub fn score_quiz(
        &self,
        session: &QuizSession,
        level: &Level,
    ) -> Result<QuizResult, ProgressionError> {
        if session.level_id() != level.id() {
            return Err(ProgressionError::LevelMismatch {
                expected: session.level_id(),
                found: level.id(),
            });
        }
        let missing = session.missing();
        if !missing.is_empty() {
            return Err(ProgressionError::IncompleteQuiz { missing });
        }
        let total = u32::try_from(session.total()).unwrap_or(u32::MAX);
        Ok(QuizResult::compute(
            level.id(),
            session.correct_count(),
            total,
            self.rules.passing_percentage_for(level),
        ))
    }

    /// Apply a scored quiz to the learner.
    ///
    /// A pass moves the learner up exactly one level and starts its first
    /// sublevel. A fail keeps the level and returns to the last sublevel with
    /// the quiz still unlocked; retries are unlimited.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::LevelMismatch` if the result is not for the
    /// learner's current level, so a replayed result never advances twice.
    pub fn apply_quiz_result(
        &self,
        learner: &mut Learner,
        result: &QuizResult,
    ) -> Result<Stage, ProgressionError> {
        let level = self
            .current_level(learner)
            .ok_or(ProgressionError::NoFurtherContent)?;
        if level.id() != result.level_id {
            return Err(ProgressionError::LevelMismatch {
                expected: level.id(),
                found: result.level_id,
            });
        }

        if result.passed {
            learner.advance_level();
            Ok(self.begin(learner))
        } else {
            Ok(Stage::Practicing(PracticeSession::resume_unlocked(level)))
        }
    }

    /// Open the one-time placement quiz.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError::AlreadyPlaced` (wrapped) for a placed learner and
    /// `ProgressionError::NoContent` for an empty question set.
    pub fn start_placement(
        &self,
        learner: &Learner,
        questions: Vec<PlacementQuestion>,
    ) -> Result<PlacementSession, ProgressionError> {
        if learner.completed_initial_quiz() {
            return Err(LearnerError::AlreadyPlaced.into());
        }
        if questions.is_empty() {
            return Err(ProgressionError::NoContent);
        }
        Ok(PlacementSession::new(questions))
    }

    /// # Errors
    ///
    /// Returns `ProgressionError::UnknownQuestion` if the question is not in the quiz.
    pub fn record_placement_answer(
        &self,
        session: &mut PlacementSession,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<(), ProgressionError> {
        session.record(question_id, answer)
    }

    /// Score the placement quiz. The placed level never exceeds the curriculum.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::IncompleteQuiz` while answers are missing.
    pub fn score_placement(
        &self,
        session: &PlacementSession,
    ) -> Result<PlacementResult, ProgressionError> {
        let missing = session.missing();
        if !missing.is_empty() {
            return Err(ProgressionError::IncompleteQuiz { missing });
        }
        let scores = session.scores();
        let ceiling = u32::try_from(self.curriculum.len()).unwrap_or(u32::MAX).max(1);
        let level = placement::place(&scores, self.rules.default_passing_percentage()).min(ceiling);
        Ok(PlacementResult { level, scores })
    }

    /// Record the placement on the learner and start practicing there.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError::AlreadyPlaced` (wrapped) if placement already happened.
    pub fn apply_placement(
        &self,
        learner: &mut Learner,
        result: &PlacementResult,
    ) -> Result<Stage, ProgressionError> {
        learner.complete_placement(result.level)?;
        Ok(self.begin(learner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::TwoContainers;
    use crate::model::{LearnerId, LevelId, Prompt, Question, QuestionKind, SublevelId};

    fn level(id: u64, sublevels: u64) -> Level {
        Level::new(
            LevelId::new(id),
            format!("Level {id}"),
            (1..=sublevels)
                .map(|s| (SublevelId::new(id * 100 + s), format!("Part {s}")))
                .collect(),
            None,
        )
        .unwrap()
    }

    fn engine() -> ProgressionEngine {
        let curriculum = Curriculum::new(vec![level(1, 2), level(2, 3)]).unwrap();
        ProgressionEngine::new(ProgressionRules::default(), curriculum)
    }

    fn box_questions() -> Vec<Question> {
        (1..=4)
            .map(|id| Question {
                id: QuestionId::new(id),
                prompt: Prompt::parse("Leave 3 in the box").unwrap(),
                kind: QuestionKind::Box {
                    start_in_box: 15,
                    target_in_box: 3,
                },
            })
            .collect()
    }

    fn quiz_questions(n: u64) -> Vec<QuizQuestion> {
        (1..=n)
            .map(|id| QuizQuestion {
                id: QuestionId::new(1000 + id),
                prompt: format!("{id} + {id}"),
                options: Vec::new(),
                correct_answer: (2 * id).to_string(),
            })
            .collect()
    }

    fn practicing(stage: Stage) -> PracticeSession {
        match stage {
            Stage::Practicing(session) => session,
            Stage::Complete => panic!("expected practice"),
        }
    }

    fn unlocked_practice(engine: &ProgressionEngine, learner: &Learner) -> PracticeSession {
        let mut session = practicing(engine.begin(learner));
        while !session.quiz_unlocked() {
            if session.needs_questions() {
                session.load_questions(box_questions());
            }
            let id = session.current_question().unwrap().id;
            engine.record_practice_answer(&mut session, id, true).unwrap();
        }
        session
    }

    fn answer_quiz(engine: &ProgressionEngine, quiz: &mut QuizSession, correct: usize) {
        let questions = quiz.questions().to_vec();
        for (i, q) in questions.iter().enumerate() {
            let answer = if i < correct {
                q.correct_answer.clone()
            } else {
                "nope".to_string()
            };
            engine.record_quiz_answer(quiz, q.id, answer).unwrap();
        }
    }

    #[test]
    fn learner_starts_on_first_sublevel_of_their_level() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let session = practicing(engine.begin(&learner));
        assert_eq!(session.level_id(), LevelId::new(1));
        assert_eq!(session.sublevel_index(), 0);
        assert_eq!(session.sublevel_id(), Some(SublevelId::new(101)));
    }

    #[test]
    fn four_in_a_row_moves_to_sublevel_two() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let mut session = practicing(engine.begin(&learner));
        session.load_questions(box_questions());

        let mut steps = Vec::new();
        for id in 1..=4 {
            let arrangement = Arrangement::Box(TwoContainers::new(3, 12));
            let answer = engine
                .answer_practice(&mut session, QuestionId::new(id), &arrangement)
                .unwrap();
            assert!(answer.correct);
            steps.push(answer.step);
        }
        assert_eq!(steps[3], PracticeStep::AdvancedSublevel { from: 0, to: 1 });
        assert_eq!(session.sublevel_index(), 1);
        assert_eq!(
            (session.correct_answers_count(), session.total_answered()),
            (0, 0)
        );
    }

    #[test]
    fn wrong_arrangement_is_recorded_as_incorrect() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let mut session = practicing(engine.begin(&learner));
        session.load_questions(box_questions());

        let answer = engine
            .answer_practice(
                &mut session,
                QuestionId::new(1),
                &Arrangement::Box(TwoContainers::new(5, 10)),
            )
            .unwrap();
        assert!(!answer.correct);
        assert_eq!(session.total_answered(), 1);
        assert_eq!(session.correct_answers_count(), 0);
    }

    #[test]
    fn quiz_is_locked_until_last_sublevel_unlocks_it() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let session = practicing(engine.begin(&learner));
        let err = engine.start_quiz(&session, quiz_questions(10)).unwrap_err();
        assert_eq!(err, ProgressionError::QuizLocked(LevelId::new(1)));
    }

    #[test]
    fn unlocked_quiz_starts_empty_and_fixed_size() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let practice = unlocked_practice(&engine, &learner);
        assert!(practice.is_last_sublevel());
        assert_eq!(practice.correct_answers_count(), 2);

        let quiz = engine.start_quiz(&practice, quiz_questions(10)).unwrap();
        assert!(quiz.quiz_mode());
        assert_eq!(quiz.total(), 10);
        assert_eq!(quiz.answered(), 0);
    }

    #[test]
    fn empty_quiz_set_is_no_content() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let practice = unlocked_practice(&engine, &learner);
        let err = engine.start_quiz(&practice, Vec::new()).unwrap_err();
        assert_eq!(err, ProgressionError::NoContent);
    }

    #[test]
    fn incomplete_quiz_cannot_be_scored() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let practice = unlocked_practice(&engine, &learner);
        let mut quiz = engine.start_quiz(&practice, quiz_questions(3)).unwrap();
        engine
            .record_quiz_answer(&mut quiz, QuestionId::new(1001), "2")
            .unwrap();

        let lvl = engine.current_level(&learner).unwrap().clone();
        let err = engine.score_quiz(&quiz, &lvl).unwrap_err();
        assert_eq!(
            err,
            ProgressionError::IncompleteQuiz {
                missing: vec![QuestionId::new(1002), QuestionId::new(1003)]
            }
        );
    }

    #[test]
    fn scoring_is_pure_and_boundary_passes() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let practice = unlocked_practice(&engine, &learner);
        let mut quiz = engine.start_quiz(&practice, quiz_questions(10)).unwrap();
        answer_quiz(&engine, &mut quiz, 7);

        let lvl = engine.current_level(&learner).unwrap().clone();
        let first = engine.score_quiz(&quiz, &lvl).unwrap();
        let second = engine.score_quiz(&quiz, &lvl).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.correct, 7);
        assert_eq!(first.total, 10);
        assert_eq!(first.percentage, 70);
        assert!(first.passed);
    }

    #[test]
    fn passing_advances_exactly_one_level() {
        let engine = engine();
        let mut learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let practice = unlocked_practice(&engine, &learner);
        let mut quiz = engine.start_quiz(&practice, quiz_questions(10)).unwrap();
        answer_quiz(&engine, &mut quiz, 10);
        let lvl = engine.current_level(&learner).unwrap().clone();
        let result = engine.score_quiz(&quiz, &lvl).unwrap();

        let next = practicing(engine.apply_quiz_result(&mut learner, &result).unwrap());
        assert_eq!(learner.level(), 2);
        assert_eq!(next.level_id(), LevelId::new(2));
        assert_eq!(next.sublevel_index(), 0);
        assert!(!next.quiz_unlocked());

        // Replaying the same result does not advance again.
        let err = engine.apply_quiz_result(&mut learner, &result).unwrap_err();
        assert!(matches!(err, ProgressionError::LevelMismatch { .. }));
        assert_eq!(learner.level(), 2);
    }

    #[test]
    fn failing_returns_to_last_sublevel_with_quiz_unlocked() {
        let engine = engine();
        let mut learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let practice = unlocked_practice(&engine, &learner);
        let mut quiz = engine.start_quiz(&practice, quiz_questions(10)).unwrap();
        answer_quiz(&engine, &mut quiz, 6);
        let lvl = engine.current_level(&learner).unwrap().clone();
        let result = engine.score_quiz(&quiz, &lvl).unwrap();
        assert!(!result.passed);

        let retry = practicing(engine.apply_quiz_result(&mut learner, &result).unwrap());
        assert_eq!(learner.level(), 1);
        assert!(retry.is_last_sublevel());
        assert!(retry.quiz_unlocked());

        // The quiz can be retaken straight away.
        assert!(engine.start_quiz(&retry, quiz_questions(10)).is_ok());
    }

    #[test]
    fn passing_the_last_level_reports_complete() {
        let engine = engine();
        let mut learner = Learner::from_persisted(LearnerId::new(1), "Ada", 2, true, false).unwrap();
        let practice = unlocked_practice(&engine, &learner);
        let mut quiz = engine.start_quiz(&practice, quiz_questions(4)).unwrap();
        answer_quiz(&engine, &mut quiz, 4);
        let lvl = engine.current_level(&learner).unwrap().clone();
        let result = engine.score_quiz(&quiz, &lvl).unwrap();

        let stage = engine.apply_quiz_result(&mut learner, &result).unwrap();
        assert_eq!(stage, Stage::Complete);
        assert_eq!(learner.level(), 3);
        assert_eq!(engine.begin(&learner), Stage::Complete);
    }

    #[test]
    fn placement_sets_level_once() {
        let engine = engine();
        let mut learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let questions: Vec<_> = quiz_questions(4)
            .into_iter()
            .zip([1, 1, 2, 2])
            .map(|(question, level)| PlacementQuestion { question, level })
            .collect();

        let mut placement = engine.start_placement(&learner, questions.clone()).unwrap();
        for (i, q) in questions.iter().enumerate() {
            let answer = if i < 2 {
                q.question.correct_answer.clone()
            } else {
                "0".to_string()
            };
            engine
                .record_placement_answer(&mut placement, q.question.id, answer)
                .unwrap();
        }
        let result = engine.score_placement(&placement).unwrap();
        assert_eq!(result.level, 2);
        assert_eq!(result.scores.len(), 2);

        let session = practicing(engine.apply_placement(&mut learner, &result).unwrap());
        assert_eq!(session.level_id(), LevelId::new(2));
        assert!(learner.completed_initial_quiz());

        let err = engine.start_placement(&learner, questions).unwrap_err();
        assert_eq!(err, ProgressionError::Learner(LearnerError::AlreadyPlaced));
    }

    #[test]
    fn placement_is_capped_at_curriculum_length() {
        let engine = engine();
        let learner = Learner::new(LearnerId::new(1), "Ada").unwrap();
        let questions: Vec<_> = quiz_questions(3)
            .into_iter()
            .zip([1, 2, 3])
            .map(|(question, level)| PlacementQuestion { question, level })
            .collect();
        let mut placement = engine.start_placement(&learner, questions.clone()).unwrap();
        for q in &questions {
            engine
                .record_placement_answer(&mut placement, q.question.id, q.question.correct_answer.clone())
                .unwrap();
        }
        assert_eq!(engine.score_placement(&placement).unwrap().level, 2);
    }
}
