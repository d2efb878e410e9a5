use std::mem;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use mathquest_core::games::Arrangement;
use mathquest_core::model::{Curriculum, Learner, LearnerId, Question, QuestionId};
use mathquest_core::progression::{
    PlacementResult, PracticeAnswer, PracticeSession, PracticeStep, ProgressionEngine,
    ProgressionError, ProgressionRules, QuizResult,
};
use storage::repository::{LearnerRepository, QuizAttemptRecord, QuizResultRepository};

use super::content::{maybe_shuffle, validate_questions};
use super::journey::{Activity, LearnerJourney};
use crate::Clock;
use crate::backend::{Backend, ProgressUpdate, QuizSubmission, SubmissionReceipt};
use crate::error::{BackendError, ProgressionServiceError};

/// Result of submitting a level quiz.
///
/// The score is final once this exists. `sync_error` reports a failed upload;
/// the attempt stays queued locally for `retry_sync`.
#[derive(Debug)]
pub struct QuizOutcome {
    pub result: QuizResult,
    pub attempt_id: i64,
    pub receipt: Option<SubmissionReceipt>,
    pub sync_error: Option<BackendError>,
}

/// Result of submitting the placement quiz.
#[derive(Debug)]
pub struct PlacementOutcome {
    pub result: PlacementResult,
    pub sync_error: Option<BackendError>,
}

/// Orchestrates content fetching, the progression engine and persistence.
///
/// Calls that reach the backend are serialised: while one is in flight, any
/// other fails fast with `ProgressionServiceError::Busy`.
#[derive(Clone)]
pub struct ProgressionService {
    clock: Clock,
    rules: ProgressionRules,
    backend: Arc<dyn Backend>,
    learners: Arc<dyn LearnerRepository>,
    results: Arc<dyn QuizResultRepository>,
    in_flight: Arc<Mutex<()>>,
    shuffle_questions: bool,
}

impl ProgressionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        backend: Arc<dyn Backend>,
        learners: Arc<dyn LearnerRepository>,
        results: Arc<dyn QuizResultRepository>,
    ) -> Self {
        Self {
            clock,
            rules: ProgressionRules::default(),
            backend,
            learners,
            results,
            in_flight: Arc::new(Mutex::new(())),
            shuffle_questions: false,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ProgressionRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_shuffle_questions(mut self, shuffle_questions: bool) -> Self {
        self.shuffle_questions = shuffle_questions;
        self
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, ProgressionServiceError> {
        self.in_flight
            .try_lock()
            .map_err(|_| ProgressionServiceError::Busy)
    }

    /// Fetch the ordered level list from the backend.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionServiceError` on backend failures or invalid levels.
    pub async fn load_curriculum(&self) -> Result<Curriculum, ProgressionServiceError> {
        let _guard = self.acquire()?;
        self.fetch_curriculum().await
    }

    async fn fetch_curriculum(&self) -> Result<Curriculum, ProgressionServiceError> {
        let levels = self.backend.fetch_levels().await?;
        Ok(Curriculum::new(levels)?)
    }

    /// Load the learner and resume where they stand: placement for a new
    /// learner, otherwise the first sublevel of their current level.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionServiceError::UnknownLearner` for an unregistered id,
    /// `Busy` while another call is in flight, and backend or storage errors.
    pub async fn start(
        &self,
        learner_id: LearnerId,
    ) -> Result<LearnerJourney, ProgressionServiceError> {
        let _guard = self.acquire()?;
        let learner = self
            .learners
            .get_learner(learner_id)
            .await?
            .ok_or(ProgressionServiceError::UnknownLearner(learner_id))?;
        let engine = ProgressionEngine::new(self.rules, self.fetch_curriculum().await?);

        let activity = if learner.completed_initial_quiz() {
            Activity::from(engine.begin(&learner))
        } else {
            let mut questions = self.backend.fetch_placement_questions().await?;
            if questions.is_empty() {
                warn!(learner = %learner_id, "no placement questions, starting at current level");
                Activity::from(engine.begin(&learner))
            } else {
                maybe_shuffle(&mut questions, self.shuffle_questions);
                Activity::Placement(engine.start_placement(&learner, questions)?)
            }
        };

        let mut journey = LearnerJourney {
            learner,
            engine,
            activity,
        };
        if let Activity::Practice(session) = &mut journey.activity {
            self.fill_practice(session).await?;
        }
        info!(
            learner = %learner_id,
            level = journey.learner.level(),
            activity = journey.activity.name(),
            "journey started"
        );
        Ok(journey)
    }

    async fn fill_practice(
        &self,
        session: &mut PracticeSession,
    ) -> Result<(), ProgressionServiceError> {
        if !session.needs_questions() {
            return Ok(());
        }
        let sublevel_id = session.sublevel_id().ok_or(ProgressionError::NoContent)?;
        let records = self
            .backend
            .fetch_practice_questions(session.level_id(), sublevel_id)
            .await?;
        let mut questions = validate_questions(records);
        if questions.is_empty() {
            return Err(ProgressionError::NoContent.into());
        }
        maybe_shuffle(&mut questions, self.shuffle_questions);
        session.load_questions(questions);
        Ok(())
    }

    /// The practice question to present next, fetching the sublevel's
    /// question set first when the session has none.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside practice, `Progression(NoContent)` when
    /// the sublevel has no usable questions, and backend errors.
    pub async fn next_practice_question(
        &self,
        journey: &mut LearnerJourney,
    ) -> Result<Question, ProgressionServiceError> {
        let Activity::Practice(session) = &mut journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "practicing",
            });
        };
        let _guard = self.acquire()?;
        self.fill_practice(session).await?;
        Ok(session
            .current_question()
            .cloned()
            .ok_or(ProgressionError::NoContent)?)
    }

    /// Judge a practice arrangement and apply the sublevel transition rule.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside practice and `Progression` for a foreign
    /// question or an arrangement of the wrong game.
    pub fn answer_practice(
        &self,
        journey: &mut LearnerJourney,
        question_id: QuestionId,
        arrangement: &Arrangement,
    ) -> Result<PracticeAnswer, ProgressionServiceError> {
        let Activity::Practice(session) = &mut journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "practicing",
            });
        };
        let answer = journey
            .engine
            .answer_practice(session, question_id, arrangement)?;
        match answer.step {
            PracticeStep::Continue => {}
            PracticeStep::AdvancedSublevel { from, to } => {
                info!(
                    learner = %journey.learner.id(),
                    level = %session.level_id(),
                    from,
                    to,
                    "advanced sublevel"
                );
            }
            PracticeStep::QuizUnlocked => {
                info!(
                    learner = %journey.learner.id(),
                    level = %session.level_id(),
                    "quiz unlocked"
                );
            }
        }
        Ok(answer)
    }

    /// Fetch the level quiz and switch the journey to it.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside practice, `Progression(QuizLocked)` before
    /// practice unlocked the quiz, `Progression(NoContent)` for an empty quiz,
    /// and backend errors.
    pub async fn start_quiz(
        &self,
        journey: &mut LearnerJourney,
    ) -> Result<(), ProgressionServiceError> {
        let Activity::Practice(practice) = &journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "practicing",
            });
        };
        if !practice.quiz_unlocked() {
            return Err(ProgressionError::QuizLocked(practice.level_id()).into());
        }
        let _guard = self.acquire()?;
        let mut questions = self.backend.fetch_quiz_questions(practice.level_id()).await?;
        maybe_shuffle(&mut questions, self.shuffle_questions);
        let quiz = journey.engine.start_quiz(practice, questions)?;

        let previous = mem::replace(&mut journey.activity, Activity::Complete);
        if let Activity::Practice(practice) = previous {
            info!(
                learner = %journey.learner.id(),
                level = %quiz.level_id(),
                questions = quiz.total(),
                "quiz started"
            );
            journey.activity = Activity::Quiz { quiz, practice };
        }
        Ok(())
    }

    /// Store a quiz answer. No correctness feedback is given.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside a quiz and `Progression(UnknownQuestion)`
    /// for a question not in the quiz.
    pub fn answer_quiz(
        &self,
        journey: &mut LearnerJourney,
        question_id: QuestionId,
        answer: &str,
    ) -> Result<(), ProgressionServiceError> {
        let Activity::Quiz { quiz, .. } = &mut journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "taking a quiz",
            });
        };
        journey.engine.record_quiz_answer(quiz, question_id, answer)?;
        Ok(())
    }

    /// Leave the quiz unscored and go back to practice.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside a quiz.
    pub fn abandon_quiz(&self, journey: &mut LearnerJourney) -> Result<(), ProgressionServiceError> {
        if !matches!(journey.activity, Activity::Quiz { .. }) {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "taking a quiz",
            });
        }
        if let Activity::Quiz { practice, .. } = mem::replace(&mut journey.activity, Activity::Complete)
        {
            journey.activity = Activity::Practice(practice);
        }
        Ok(())
    }

    /// Score the quiz, apply it to the learner, persist, then report it.
    ///
    /// Scoring and the level change are committed locally before the backend
    /// is contacted; an upload failure is returned in `QuizOutcome::sync_error`.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside a quiz, `Progression(IncompleteQuiz)`
    /// while answers are missing, `Busy`, and storage errors. The journey is
    /// unchanged on error and the stored level is only raised once the
    /// attempt is queued for sync.
    pub async fn submit_quiz(
        &self,
        journey: &mut LearnerJourney,
    ) -> Result<QuizOutcome, ProgressionServiceError> {
        let Activity::Quiz { quiz, .. } = &journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "taking a quiz",
            });
        };
        let _guard = self.acquire()?;
        let level = journey
            .engine
            .curriculum()
            .by_id(quiz.level_id())
            .ok_or(ProgressionError::NoFurtherContent)?;
        let result = journey.engine.score_quiz(quiz, level)?;

        let mut learner = journey.learner.clone();
        let stage = journey.engine.apply_quiz_result(&mut learner, &result)?;
        // The attempt is queued before the level moves, so a stored level is
        // never ahead of the attempts that justify it.
        let attempt = QuizAttemptRecord::from_result(learner.id(), &result, self.clock.now());
        let attempt_id = self.results.append_result(&attempt).await?;
        self.learners.save_learner(&learner).await?;

        info!(
            learner = %learner.id(),
            level = %result.level_id,
            percentage = result.percentage,
            passed = result.passed,
            "quiz scored"
        );
        journey.learner = learner;
        journey.activity = Activity::from(stage);

        let (receipt, sync_error) = match self.upload(&journey.learner, &result, attempt_id).await {
            Ok(receipt) => (Some(receipt), None),
            Err(err) => {
                warn!(error = %err, attempt_id, "quiz result not synced");
                (None, Some(err))
            }
        };

        Ok(QuizOutcome {
            result,
            attempt_id,
            receipt,
            sync_error,
        })
    }

    async fn upload(
        &self,
        learner: &Learner,
        result: &QuizResult,
        attempt_id: i64,
    ) -> Result<SubmissionReceipt, BackendError> {
        let submission = QuizSubmission::from_result(learner.id(), result);
        let receipt = self.backend.submit_quiz_result(&submission).await?;
        if let Err(err) = self.results.mark_synced(attempt_id).await {
            warn!(error = %err, attempt_id, "could not mark attempt as synced");
        }
        self.backend
            .update_learner_progress(&progress_of(learner))
            .await?;
        Ok(receipt)
    }

    /// Store a placement answer.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside placement and `Progression(UnknownQuestion)`
    /// for a question not in the placement quiz.
    pub fn answer_placement(
        &self,
        journey: &mut LearnerJourney,
        question_id: QuestionId,
        answer: &str,
    ) -> Result<(), ProgressionServiceError> {
        let Activity::Placement(session) = &mut journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "placing",
            });
        };
        journey
            .engine
            .record_placement_answer(session, question_id, answer)?;
        Ok(())
    }

    /// Score the placement quiz, place the learner and start practice there.
    ///
    /// # Errors
    ///
    /// Returns `WrongActivity` outside placement, `Progression(IncompleteQuiz)`
    /// while answers are missing, `Busy`, and storage errors.
    pub async fn submit_placement(
        &self,
        journey: &mut LearnerJourney,
    ) -> Result<PlacementOutcome, ProgressionServiceError> {
        let Activity::Placement(session) = &journey.activity else {
            return Err(ProgressionServiceError::WrongActivity {
                expected: "placing",
            });
        };
        let _guard = self.acquire()?;
        let result = journey.engine.score_placement(session)?;

        let mut learner = journey.learner.clone();
        let stage = journey.engine.apply_placement(&mut learner, &result)?;
        self.learners.save_learner(&learner).await?;
        info!(learner = %learner.id(), level = result.level, "learner placed");
        journey.learner = learner;
        journey.activity = Activity::from(stage);

        let sync_error = self
            .backend
            .update_learner_progress(&progress_of(&journey.learner))
            .await
            .err();
        if let Some(err) = &sync_error {
            warn!(error = %err, "placement not synced");
        }
        Ok(PlacementOutcome { result, sync_error })
    }

    /// Re-send quiz attempts the backend has not acknowledged, oldest first,
    /// then the learner's progress. Returns how many attempts were sent.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLearner`, `Busy`, and the first backend or storage
    /// error; attempts sent before it stay marked as synced.
    pub async fn retry_sync(&self, learner_id: LearnerId) -> Result<usize, ProgressionServiceError> {
        let _guard = self.acquire()?;
        let learner = self
            .learners
            .get_learner(learner_id)
            .await?
            .ok_or(ProgressionServiceError::UnknownLearner(learner_id))?;
        let pending = self.results.list_unsynced(learner_id).await?;
        let mut sent = 0;
        for row in &pending {
            let submission = QuizSubmission {
                learner_id,
                level_id: row.attempt.level_id,
                correct: row.attempt.correct,
                total: row.attempt.total,
            };
            self.backend.submit_quiz_result(&submission).await?;
            self.results.mark_synced(row.id).await?;
            sent += 1;
        }
        self.backend
            .update_learner_progress(&progress_of(&learner))
            .await?;
        info!(learner = %learner_id, sent, "sync retried");
        Ok(sent)
    }
}

fn progress_of(learner: &Learner) -> ProgressUpdate {
    ProgressUpdate {
        learner_id: learner.id(),
        level: learner.level(),
        completed_initial_quiz: learner.completed_initial_quiz(),
    }
}
