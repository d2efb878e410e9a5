use std::sync::Arc;

use tracing::info;

use mathquest_core::model::{Learner, LearnerId};
use storage::repository::{LearnerRepository, QuizAttemptRow, QuizResultRepository};

use crate::error::LearnerServiceError;

/// Registration and explicit load/save of learner state.
#[derive(Clone)]
pub struct LearnerService {
    learners: Arc<dyn LearnerRepository>,
    results: Arc<dyn QuizResultRepository>,
}

impl LearnerService {
    #[must_use]
    pub fn new(
        learners: Arc<dyn LearnerRepository>,
        results: Arc<dyn QuizResultRepository>,
    ) -> Self {
        Self { learners, results }
    }

    /// Create a learner at level 1 who still has to take the placement quiz.
    ///
    /// # Errors
    ///
    /// Returns `LearnerServiceError::AlreadyRegistered` for a taken id and
    /// `LearnerServiceError::Learner` for a blank name.
    pub async fn register(
        &self,
        id: LearnerId,
        name: &str,
    ) -> Result<Learner, LearnerServiceError> {
        if self.learners.get_learner(id).await?.is_some() {
            return Err(LearnerServiceError::AlreadyRegistered(id));
        }
        let learner = Learner::new(id, name)?;
        self.learners.save_learner(&learner).await?;
        info!(learner = %id, "registered learner");
        Ok(learner)
    }

    /// # Errors
    ///
    /// Returns `LearnerServiceError::UnknownLearner` if no learner has this id.
    pub async fn load(&self, id: LearnerId) -> Result<Learner, LearnerServiceError> {
        self.learners
            .get_learner(id)
            .await?
            .ok_or(LearnerServiceError::UnknownLearner(id))
    }

    /// Load the learner, registering them first when unknown.
    ///
    /// # Errors
    ///
    /// Returns `LearnerServiceError` for storage failures or a blank name.
    pub async fn load_or_register(
        &self,
        id: LearnerId,
        name: &str,
    ) -> Result<Learner, LearnerServiceError> {
        match self.learners.get_learner(id).await? {
            Some(learner) => Ok(learner),
            None => self.register(id, name).await,
        }
    }

    /// # Errors
    ///
    /// Returns `LearnerServiceError::Storage` if the learner cannot be stored.
    pub async fn save(&self, learner: &Learner) -> Result<(), LearnerServiceError> {
        self.learners.save_learner(learner).await?;
        Ok(())
    }

    /// Recent quiz attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LearnerServiceError::Storage` on storage failures.
    pub async fn recent_results(
        &self,
        id: LearnerId,
        limit: u32,
    ) -> Result<Vec<QuizAttemptRow>, LearnerServiceError> {
        Ok(self.results.list_results(id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    fn service() -> LearnerService {
        let repo = InMemoryRepository::new();
        LearnerService::new(Arc::new(repo.clone()), Arc::new(repo))
    }

    #[tokio::test]
    async fn register_then_load() {
        let service = service();
        let learner = service.register(LearnerId::new(1), "Ada").await.unwrap();
        assert_eq!(learner.level(), 1);
        assert!(!learner.completed_initial_quiz());

        let loaded = service.load(LearnerId::new(1)).await.unwrap();
        assert_eq!(loaded, learner);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let service = service();
        service.register(LearnerId::new(1), "Ada").await.unwrap();
        let err = service.register(LearnerId::new(1), "Bea").await.unwrap_err();
        assert!(matches!(err, LearnerServiceError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn unknown_learner_is_reported() {
        let err = service().load(LearnerId::new(9)).await.unwrap_err();
        assert!(matches!(err, LearnerServiceError::UnknownLearner(_)));
    }

    #[tokio::test]
    async fn load_or_register_keeps_existing_learner() {
        let service = service();
        service.register(LearnerId::new(2), "Ada").await.unwrap();
        let learner = service
            .load_or_register(LearnerId::new(2), "Someone else")
            .await
            .unwrap();
        assert_eq!(learner.name(), "Ada");
    }
}
