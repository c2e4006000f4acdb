//! Nutrition estimate types.
//!
//! [`RawNutrition`] is the unvalidated payload decoded from a classifier reply.
//! [`NutritionRecord`] is the validated value the rest of the pipeline works with;
//! it can only be built through [`NutritionRecord::from_estimate`] or
//! [`NutritionRecord::fallback`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{NonEmptyString, RecordId};

/// Label carried by the degraded record. Classifier output may not use it.
pub const FALLBACK_FOOD_NAME: &str = "Unidentified meal (fallback estimate)";
pub const FALLBACK_CALORIES: f64 = 550.0;
pub const FALLBACK_PROTEIN_G: f64 = 25.5;
pub const FALLBACK_CARBS_G: f64 = 45.0;
pub const FALLBACK_FATS_G: f64 = 20.0;

/// Nutrition payload exactly as the classifier reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawNutrition {
    pub food_name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
    pub confidence: f64,
}

/// Where a record's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Classifier,
    Fallback,
}

impl EstimateSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Fallback => "fallback",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "classifier" => Some(Self::Classifier),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("food_name must not be empty")]
    EmptyFoodName,
    #[error("food_name uses the reserved fallback label")]
    ReservedLabel,
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be >= 0 (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("confidence must be within (0.0, 1.0] (got {0})")]
    ConfidenceOutOfRange(f64),
}

/// A validated nutrition estimate. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionRecord {
    food_name: NonEmptyString,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fats_g: f64,
    confidence: f64,
    #[serde(skip)]
    source: EstimateSource,
}

impl NutritionRecord {
    /// Validate a classifier estimate.
    ///
    /// Confidence `0.0` is reserved for the fallback record, so a classifier
    /// estimate must report a confidence in `(0.0, 1.0]`.
    pub fn from_estimate(raw: RawNutrition) -> Result<Self, RecordError> {
        let food_name =
            NonEmptyString::new(raw.food_name.trim()).map_err(|_| RecordError::EmptyFoodName)?;
        if food_name.as_str() == FALLBACK_FOOD_NAME {
            return Err(RecordError::ReservedLabel);
        }

        let calories = non_negative("calories", raw.calories)?;
        let protein_g = non_negative("protein_g", raw.protein_g)?;
        let carbs_g = non_negative("carbs_g", raw.carbs_g)?;
        let fats_g = non_negative("fats_g", raw.fats_g)?;

        if !raw.confidence.is_finite() {
            return Err(RecordError::NonFinite {
                field: "confidence",
            });
        }
        if raw.confidence <= 0.0 || raw.confidence > 1.0 {
            return Err(RecordError::ConfidenceOutOfRange(raw.confidence));
        }

        Ok(Self {
            food_name,
            calories,
            protein_g,
            carbs_g,
            fats_g,
            confidence: raw.confidence,
            source: EstimateSource::Classifier,
        })
    }

    /// The fixed degraded record substituted when classification cannot be trusted.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            food_name: NonEmptyString(FALLBACK_FOOD_NAME.to_string()),
            calories: FALLBACK_CALORIES,
            protein_g: FALLBACK_PROTEIN_G,
            carbs_g: FALLBACK_CARBS_G,
            fats_g: FALLBACK_FATS_G,
            confidence: 0.0,
            source: EstimateSource::Fallback,
        }
    }

    #[must_use]
    pub fn food_name(&self) -> &str {
        self.food_name.as_str()
    }

    #[must_use]
    pub const fn calories(&self) -> f64 {
        self.calories
    }

    #[must_use]
    pub const fn protein_g(&self) -> f64 {
        self.protein_g
    }

    #[must_use]
    pub const fn carbs_g(&self) -> f64 {
        self.carbs_g
    }

    #[must_use]
    pub const fn fats_g(&self) -> f64 {
        self.fats_g
    }

    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub const fn source(&self) -> EstimateSource {
        self.source
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, EstimateSource::Fallback)
    }

    /// Plain payload form, used when the record leaves the process.
    #[must_use]
    pub fn to_raw(&self) -> RawNutrition {
        RawNutrition {
            food_name: self.food_name.as_str().to_string(),
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fats_g: self.fats_g,
            confidence: self.confidence,
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, RecordError> {
    if !value.is_finite() {
        return Err(RecordError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(RecordError::Negative { field, value });
    }
    Ok(value)
}

/// One persisted record as read back from the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: RecordId,
    pub user_id: String,
    pub food_name: String,
    pub calories: f64,
    pub timestamp: DateTime<Utc>,
    pub nutrition: RawNutrition,
    pub source: EstimateSource,
}
