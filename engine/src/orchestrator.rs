//! The request pipeline: classify, resolve, then persist and sync concurrently.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use nutrilens_config::Timeouts;
use nutrilens_fitness::FitnessSync;
use nutrilens_providers::VisionClassifier;
use nutrilens_store::{PersistError, PersistenceSink, SaveReceipt};
use nutrilens_types::{
    AnalysisResult, ClassificationFailure, HistoryEntry, InvalidUserId, NutritionRecord,
    SyncOutcome, UserId,
};
use thiserror::Error;
use tokio::time::timeout;

use crate::fallback;
use crate::intake::{ImageUpload, InputError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] InvalidUserId),
    #[error(transparent)]
    Store(#[from] PersistError),
}

/// Runs one analysis per call. Holds no per-request state, so one instance
/// serves all requests concurrently.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    classifier: Arc<dyn VisionClassifier>,
    store: Arc<dyn PersistenceSink>,
    fitness: Arc<dyn FitnessSync>,
    timeouts: Timeouts,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("classifier", &self.classifier.name())
            .field("store", &self.store.name())
            .field("fitness", &self.fitness.platform())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl AnalysisOrchestrator {
    #[must_use]
    pub fn new(
        classifier: Arc<dyn VisionClassifier>,
        store: Arc<dyn PersistenceSink>,
        fitness: Arc<dyn FitnessSync>,
    ) -> Self {
        Self {
            classifier,
            store,
            fitness,
            timeouts: Timeouts::default(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Analyze one uploaded image for `user_id`.
    ///
    /// Only malformed input is an error. Collaborator outages degrade the
    /// returned data instead. Image decoding runs on the blocking pool.
    pub async fn analyze(
        &self,
        image: Vec<u8>,
        user_id: &str,
    ) -> Result<AnalysisResult, InputError> {
        let user_id = UserId::parse(user_id)?;
        let upload = ImageUpload::decode(image).await?;
        Ok(self.analyze_upload(&upload, &user_id).await)
    }

    pub async fn analyze_upload(&self, upload: &ImageUpload, user_id: &UserId) -> AnalysisResult {
        let started = Instant::now();

        let outcome = match timeout(
            self.timeouts.classify,
            self.classifier.classify(upload.as_classifier_image()),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => ClassificationFailure::Timeout(self.timeouts.classify).into(),
        };
        let record = fallback::resolve(outcome);

        let observed_at = Utc::now();
        let ((), sync_status) = tokio::join!(
            self.persist(user_id, &record, observed_at),
            self.sync(user_id, &record),
        );

        tracing::info!(
            user_id = %user_id,
            food_name = record.food_name(),
            source = record.source().as_str(),
            status = ?sync_status.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        AnalysisResult::new(record, sync_status)
    }

    /// Most recent records for `user_id`, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let user_id = UserId::parse(user_id)?;
        match timeout(self.timeouts.persist, self.store.history(&user_id, limit)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PersistError::Timeout(self.timeouts.persist).into()),
        }
    }

    async fn persist(
        &self,
        user_id: &UserId,
        record: &NutritionRecord,
        observed_at: chrono::DateTime<Utc>,
    ) {
        let result = match timeout(
            self.timeouts.persist,
            self.store.save(user_id, record, observed_at),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PersistError::Timeout(self.timeouts.persist)),
        };

        match result {
            Ok(SaveReceipt::Written(record_id)) => {
                tracing::info!(user_id = %user_id, record_id = %record_id, "Record saved");
            }
            Ok(SaveReceipt::Skipped) => {
                tracing::debug!(user_id = %user_id, "Store not configured; record not saved");
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, reason = %e, "Failed to save record");
            }
        }
    }

    async fn sync(&self, user_id: &UserId, record: &NutritionRecord) -> SyncOutcome {
        let call = self
            .fitness
            .sync(user_id, record.calories(), record.protein_g());
        match timeout(self.timeouts.sync, call).await {
            Ok(outcome) => {
                if !outcome.is_success() {
                    tracing::warn!(
                        user_id = %user_id,
                        platform = self.fitness.platform(),
                        "Fitness sync failed"
                    );
                }
                outcome
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user_id,
                    platform = self.fitness.platform(),
                    "Fitness sync timed out"
                );
                SyncOutcome::failed(format!(
                    "fitness sync timed out after {}ms",
                    self.timeouts.sync.as_millis()
                ))
            }
        }
    }
}
