use std::time::Duration;

use thiserror::Error;

use crate::RawNutrition;

/// Result of one classification attempt. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Success(RawNutrition),
    Failure(ClassificationFailure),
}

impl ClassificationOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<ClassificationFailure> for ClassificationOutcome {
    fn from(failure: ClassificationFailure) -> Self {
        Self::Failure(failure)
    }
}

/// Why the classifier could not produce a usable estimate.
///
/// None of these reach the caller; they select the fallback record and are logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationFailure {
    #[error("vision capability not configured: {0}")]
    NotConfigured(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("classification timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("API error {status}: {body}")]
    ApiStatus { status: u16, body: String },
    #[error("response blocked: {0}")]
    Blocked(String),
    #[error("classifier returned no text")]
    EmptyReply,
    #[error("unparseable classifier reply: {0}")]
    Unparseable(String),
    #[error("classifier reported an error: {0}")]
    ClassifierError(String),
}
