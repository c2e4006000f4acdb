//! Mapping of a classification outcome to the record the pipeline continues with.
//!
//! A failed classification, or a successful one whose payload does not validate,
//! yields [`NutritionRecord::fallback`]. This step cannot fail.

use nutrilens_types::{ClassificationOutcome, NutritionRecord};

#[must_use]
pub fn resolve(outcome: ClassificationOutcome) -> NutritionRecord {
    match outcome {
        ClassificationOutcome::Success(raw) => match NutritionRecord::from_estimate(raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(reason = %e, "Classifier estimate rejected; using fallback");
                NutritionRecord::fallback()
            }
        },
        ClassificationOutcome::Failure(failure) => {
            tracing::warn!(reason = %failure, "Classification failed; using fallback");
            NutritionRecord::fallback()
        }
    }
}
