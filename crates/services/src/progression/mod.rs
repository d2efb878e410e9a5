mod content;
mod journey;
mod workflow;

// Public API of the progression subsystem.
pub use crate::error::ProgressionServiceError;
pub use content::validate_questions;
pub use journey::{Activity, LearnerJourney};
pub use workflow::{PlacementOutcome, ProgressionService, QuizOutcome};
