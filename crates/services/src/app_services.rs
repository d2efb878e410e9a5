use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::ai_ordering_service::AiOrderingService;
use crate::backend::Backend;
use crate::error::AppServicesError;
use crate::learner_service::LearnerService;
use crate::progression::ProgressionService;

/// Assembles app-facing services over one storage and one backend.
#[derive(Clone)]
pub struct AppServices {
    backend: Arc<dyn Backend>,
    learners: Arc<LearnerService>,
    progression: Arc<ProgressionService>,
    ai_ordering: Arc<AiOrderingService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, clock, backend))
    }

    #[must_use]
    pub fn new(storage: Storage, clock: Clock, backend: Arc<dyn Backend>) -> Self {
        let learners = Arc::new(LearnerService::new(
            Arc::clone(&storage.learners),
            Arc::clone(&storage.results),
        ));
        let progression = Arc::new(ProgressionService::new(
            clock,
            Arc::clone(&backend),
            Arc::clone(&storage.learners),
            Arc::clone(&storage.results),
        ));
        let ai_ordering = Arc::new(AiOrderingService::from_env());

        Self {
            backend,
            learners,
            progression,
            ai_ordering,
        }
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn learners(&self) -> Arc<LearnerService> {
        Arc::clone(&self.learners)
    }

    #[must_use]
    pub fn progression(&self) -> Arc<ProgressionService> {
        Arc::clone(&self.progression)
    }

    #[must_use]
    pub fn ai_ordering(&self) -> Arc<AiOrderingService> {
        Arc::clone(&self.ai_ordering)
    }
}
