#![forbid(unsafe_code)]

pub mod ai_ordering_service;
pub mod app_services;
pub mod backend;
pub mod error;
pub mod learner_service;
pub mod progression;

pub use mathquest_core::Clock;

pub use ai_ordering_service::{AiOrderingConfig, AiOrderingService};
pub use app_services::AppServices;
pub use backend::{
    Backend, BackendConfig, ContentPack, HttpBackend, StaticBackend, SubmissionReceipt,
};
pub use error::{
    AiOrderingError, AppServicesError, BackendError, LearnerServiceError, ProgressionServiceError,
};
pub use learner_service::LearnerService;
pub use progression::{
    Activity, LearnerJourney, PlacementOutcome, ProgressionService, QuizOutcome,
};
