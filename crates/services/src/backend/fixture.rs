use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mathquest_core::model::{
    Level, LevelId, PlacementQuestion, QuestionRecord, QuizQuestion, SublevelId,
};
use mathquest_core::progression::percentage;

use super::{Backend, ProgressUpdate, QuizSubmission, SubmissionReceipt};
use crate::error::BackendError;

/// Practice questions of one sublevel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSet {
    pub level_id: LevelId,
    pub sublevel_id: SublevelId,
    pub questions: Vec<QuestionRecord>,
}

/// Quiz questions of one level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSet {
    pub level_id: LevelId,
    pub questions: Vec<QuizQuestion>,
}

/// Everything a `StaticBackend` serves, as stored in a content file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPack {
    pub levels: Vec<Level>,
    #[serde(default)]
    pub practice: Vec<PracticeSet>,
    #[serde(default)]
    pub quizzes: Vec<QuizSet>,
    #[serde(default)]
    pub placement: Vec<PlacementQuestion>,
}

/// Offline backend serving a fixed content pack.
///
/// Submissions and progress updates are kept in memory so callers can inspect
/// what would have been sent.
#[derive(Clone, Default)]
pub struct StaticBackend {
    pack: Arc<ContentPack>,
    submissions: Arc<Mutex<Vec<QuizSubmission>>>,
    progress: Arc<Mutex<Vec<ProgressUpdate>>>,
}

impl StaticBackend {
    #[must_use]
    pub fn new(pack: ContentPack) -> Self {
        Self {
            pack: Arc::new(pack),
            ..Self::default()
        }
    }

    /// Parse a content pack from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Decode` if the JSON is malformed or a level is invalid.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let pack: ContentPack =
            serde_json::from_str(json).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Self::new(pack))
    }

    /// Load a content pack from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Io` if the file cannot be read and
    /// `BackendError::Decode` if its content is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn pack(&self) -> &ContentPack {
        &self.pack
    }

    /// Submissions received so far, oldest first.
    #[must_use]
    pub fn submissions(&self) -> Vec<QuizSubmission> {
        self.submissions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Progress updates received so far, oldest first.
    #[must_use]
    pub fn progress_updates(&self) -> Vec<ProgressUpdate> {
        self.progress
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> BackendError {
    BackendError::Decode(e.to_string())
}

#[async_trait]
impl Backend for StaticBackend {
    async fn fetch_levels(&self) -> Result<Vec<Level>, BackendError> {
        Ok(self.pack.levels.clone())
    }

    async fn fetch_practice_questions(
        &self,
        level_id: LevelId,
        sublevel_id: SublevelId,
    ) -> Result<Vec<QuestionRecord>, BackendError> {
        Ok(self
            .pack
            .practice
            .iter()
            .filter(|set| set.level_id == level_id && set.sublevel_id == sublevel_id)
            .flat_map(|set| set.questions.iter().cloned())
            .collect())
    }

    async fn fetch_quiz_questions(
        &self,
        level_id: LevelId,
    ) -> Result<Vec<QuizQuestion>, BackendError> {
        Ok(self
            .pack
            .quizzes
            .iter()
            .filter(|set| set.level_id == level_id)
            .flat_map(|set| set.questions.iter().cloned())
            .collect())
    }

    async fn fetch_placement_questions(&self) -> Result<Vec<PlacementQuestion>, BackendError> {
        Ok(self.pack.placement.clone())
    }

    async fn submit_quiz_result(
        &self,
        submission: &QuizSubmission,
    ) -> Result<SubmissionReceipt, BackendError> {
        self.submissions
            .lock()
            .map_err(poisoned)?
            .push(submission.clone());
        Ok(SubmissionReceipt {
            message: "Result saved".into(),
            progress_percentage: Some(percentage(submission.correct, submission.total)),
        })
    }

    async fn update_learner_progress(&self, update: &ProgressUpdate) -> Result<(), BackendError> {
        self.progress.lock().map_err(poisoned)?.push(update.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACK: &str = r#"{
        "levels": [
            { "id": 1, "name": "Counting", "sublevels": [
                { "id": 11, "description": "Color" },
                { "id": 12, "description": "Boxes" }
            ] }
        ],
        "practice": [
            { "levelId": 1, "sublevelId": 11, "questions": [
                { "id": 1, "prompt": "Color 3 stars", "type": "color-up", "totalItems": 5, "targetColored": 3 }
            ] }
        ],
        "quizzes": [
            { "levelId": 1, "questions": [
                { "id": 100, "question": "2 + 2", "options": ["3", "4"], "correctAnswer": "4" }
            ] }
        ]
    }"#;

    #[tokio::test]
    async fn serves_content_by_level_and_sublevel() {
        let backend = StaticBackend::from_json(PACK).unwrap();
        let levels = backend.fetch_levels().await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].sublevel_count(), 2);

        let practice = backend
            .fetch_practice_questions(LevelId::new(1), SublevelId::new(11))
            .await
            .unwrap();
        assert_eq!(practice.len(), 1);
        let empty = backend
            .fetch_practice_questions(LevelId::new(1), SublevelId::new(12))
            .await
            .unwrap();
        assert!(empty.is_empty());

        let quiz = backend.fetch_quiz_questions(LevelId::new(1)).await.unwrap();
        assert_eq!(quiz[0].correct_answer, "4");
        assert!(backend.fetch_placement_questions().await.unwrap().is_empty());
    }

    #[test]
    fn invalid_level_is_a_decode_error() {
        let err = StaticBackend::from_json(r#"{ "levels": [ { "id": 1, "name": "", "sublevels": [] } ] }"#)
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn records_submissions() {
        let backend = StaticBackend::default();
        let submission = QuizSubmission {
            learner_id: mathquest_core::model::LearnerId::new(1),
            level_id: LevelId::new(1),
            correct: 3,
            total: 4,
        };
        let receipt = backend.submit_quiz_result(&submission).await.unwrap();
        assert_eq!(receipt.progress_percentage, Some(75));
        assert_eq!(backend.submissions(), vec![submission]);
    }
}
