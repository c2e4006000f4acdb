//! Core domain types for NutriLens.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod ids;
mod nutrition;
mod outcome;
mod sync;

pub use ids::{InvalidUserId, RecordId, UserId};
pub use nutrition::{
    EstimateSource, FALLBACK_CALORIES, FALLBACK_CARBS_G, FALLBACK_FATS_G, FALLBACK_FOOD_NAME,
    FALLBACK_PROTEIN_G, HistoryEntry, NutritionRecord, RawNutrition, RecordError,
};
pub use outcome::{ClassificationFailure, ClassificationOutcome};
pub use sync::{SyncOutcome, SyncStatus};

use serde::Serialize;
use thiserror::Error;

/// Message returned with every completed analysis, degraded or not.
pub const ANALYSIS_MESSAGE: &str = "Food analyzed successfully";

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("value must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Credential Types
// ============================================================================

/// Credential string (API key or bearer token).
///
/// Note: `Debug` is manually implemented to redact the value, preventing accidental
/// credential disclosure in logs or error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

impl ApiKey {
    /// Returns `None` for blank input so an empty env var reads as "not configured".
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

/// Why a collaborator client could not be constructed.
///
/// `NotConfigured` is the expected "credentials absent" case; bootstrap swaps in a
/// stand-in collaborator for it. `Invalid` means configuration was present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("invalid {subsystem} configuration: {message}")]
    Invalid {
        subsystem: &'static str,
        message: String,
    },
}

// ============================================================================
// Response Aggregate
// ============================================================================

/// The response for one analysis request.
///
/// Degraded quality is carried in the data (`nutrition.confidence == 0.0`,
/// `sync_status.status == failed`), never as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub nutrition: NutritionRecord,
    pub message: String,
    pub sync_status: SyncOutcome,
}

impl AnalysisResult {
    #[must_use]
    pub fn new(nutrition: NutritionRecord, sync_status: SyncOutcome) -> Self {
        Self {
            nutrition,
            message: ANALYSIS_MESSAGE.to_string(),
            sync_status,
        }
    }
}
