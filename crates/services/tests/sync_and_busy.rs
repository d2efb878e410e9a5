mod common;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use common::{LEARNER, harness, harness_with, pack, solve};
use mathquest_core::model::{
    Level, LevelId, PlacementQuestion, QuestionRecord, QuizQuestion, SublevelId,
};
use services::backend::{
    Backend, ProgressUpdate, QuizSubmission, StaticBackend, SubmissionReceipt,
};
use services::{BackendError, ProgressionServiceError};
use storage::repository::{LearnerRepository, QuizResultRepository};

/// Serves content but rejects every upload.
struct OfflineBackend(StaticBackend);

#[async_trait]
impl Backend for OfflineBackend {
    async fn fetch_levels(&self) -> Result<Vec<Level>, BackendError> {
        self.0.fetch_levels().await
    }

    async fn fetch_practice_questions(
        &self,
        level_id: LevelId,
        sublevel_id: SublevelId,
    ) -> Result<Vec<QuestionRecord>, BackendError> {
        self.0.fetch_practice_questions(level_id, sublevel_id).await
    }

    async fn fetch_quiz_questions(
        &self,
        level_id: LevelId,
    ) -> Result<Vec<QuizQuestion>, BackendError> {
        self.0.fetch_quiz_questions(level_id).await
    }

    async fn fetch_placement_questions(&self) -> Result<Vec<PlacementQuestion>, BackendError> {
        self.0.fetch_placement_questions().await
    }

    async fn submit_quiz_result(
        &self,
        _submission: &QuizSubmission,
    ) -> Result<SubmissionReceipt, BackendError> {
        Err(BackendError::Disabled)
    }

    async fn update_learner_progress(&self, _update: &ProgressUpdate) -> Result<(), BackendError> {
        Err(BackendError::Disabled)
    }
}

/// Holds `fetch_levels` open until released.
struct GatedBackend {
    inner: StaticBackend,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl Backend for GatedBackend {
    async fn fetch_levels(&self) -> Result<Vec<Level>, BackendError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.fetch_levels().await
    }

    async fn fetch_practice_questions(
        &self,
        level_id: LevelId,
        sublevel_id: SublevelId,
    ) -> Result<Vec<QuestionRecord>, BackendError> {
        self.inner.fetch_practice_questions(level_id, sublevel_id).await
    }

    async fn fetch_quiz_questions(
        &self,
        level_id: LevelId,
    ) -> Result<Vec<QuizQuestion>, BackendError> {
        self.inner.fetch_quiz_questions(level_id).await
    }

    async fn fetch_placement_questions(&self) -> Result<Vec<PlacementQuestion>, BackendError> {
        self.inner.fetch_placement_questions().await
    }

    async fn submit_quiz_result(
        &self,
        submission: &QuizSubmission,
    ) -> Result<SubmissionReceipt, BackendError> {
        self.inner.submit_quiz_result(submission).await
    }

    async fn update_learner_progress(&self, update: &ProgressUpdate) -> Result<(), BackendError> {
        self.inner.update_learner_progress(update).await
    }
}

#[tokio::test]
async fn failed_upload_keeps_local_score_and_retries_later() {
    let h = harness(Arc::new(OfflineBackend(StaticBackend::new(pack()))));
    h.learners.register(LEARNER, "Ada").await.unwrap();
    let mut journey = h.progression.start(LEARNER).await.unwrap();

    while !journey.practice().unwrap().quiz_unlocked() {
        let question = h.progression.next_practice_question(&mut journey).await.unwrap();
        h.progression
            .answer_practice(&mut journey, question.id, &solve(&question))
            .unwrap();
    }
    h.progression.start_quiz(&mut journey).await.unwrap();
    let questions = journey.quiz().unwrap().questions().to_vec();
    for question in &questions {
        h.progression
            .answer_quiz(&mut journey, question.id, &question.correct_answer)
            .unwrap();
    }

    let outcome = h.progression.submit_quiz(&mut journey).await.unwrap();
    assert!(outcome.result.passed);
    assert!(outcome.receipt.is_none());
    assert!(matches!(outcome.sync_error, Some(BackendError::Disabled)));

    let stored = h.repo.get_learner(LEARNER).await.unwrap().unwrap();
    assert_eq!(stored.level(), 2);
    assert_eq!(h.repo.list_unsynced(LEARNER).await.unwrap().len(), 1);

    let online = Arc::new(StaticBackend::new(pack()));
    let reconnected = harness_with(h.repo.clone(), online.clone());
    assert_eq!(reconnected.progression.retry_sync(LEARNER).await.unwrap(), 1);
    assert!(h.repo.list_unsynced(LEARNER).await.unwrap().is_empty());

    let sent = online.submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].correct, 10);
    assert_eq!(online.progress_updates().last().unwrap().level, 2);

    assert_eq!(reconnected.progression.retry_sync(LEARNER).await.unwrap(), 0);
}

#[tokio::test]
async fn second_request_while_one_is_in_flight_is_busy() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let h = harness(Arc::new(GatedBackend {
        inner: StaticBackend::new(pack()),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    }));
    h.learners.register(LEARNER, "Ada").await.unwrap();

    let background = h.progression.clone();
    let task = tokio::spawn(async move { background.load_curriculum().await.map(|c| c.len()) });
    entered.notified().await;

    let err = h.progression.start(LEARNER).await.unwrap_err();
    assert!(matches!(err, ProgressionServiceError::Busy));

    release.notify_one();
    assert_eq!(task.await.unwrap().unwrap(), 2);

    // The lock is free again once the first call returned.
    release.notify_one();
    let journey = h.progression.start(LEARNER).await.unwrap();
    assert!(journey.practice().is_some());
}
