//! Durable, append-only storage of nutrition records.
//!
//! - [`PersistenceSink`] - object-safe seam the engine writes through
//! - [`firestore`] - Firestore REST implementation
//! - [`NotConfiguredStore`] - stand-in when no credentials are available
//!
//! A failed write is reported as [`PersistError`] but never aborts a request.
//! Records are keyed by user and never updated or deleted.

pub mod firestore;
mod value;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nutrilens_types::{HistoryEntry, NutritionRecord, RecordId, UserId};
use thiserror::Error;

pub use firestore::{FirestoreConfig, FirestoreStore};

pub type SaveFut<'a> = Pin<Box<dyn Future<Output = Result<SaveReceipt, PersistError>> + Send + 'a>>;
pub type HistoryFut<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<HistoryEntry>, PersistError>> + Send + 'a>>;

/// What happened to a record handed to [`PersistenceSink::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveReceipt {
    Written(RecordId),
    /// The store is not configured; nothing was written.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("store rejected request ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
}

impl PersistError {
    pub(crate) fn from_reqwest(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(error.to_string())
        }
    }
}

pub trait PersistenceSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Append one record for `user_id`, stamped with `observed_at`.
    fn save<'a>(
        &'a self,
        user_id: &'a UserId,
        record: &'a NutritionRecord,
        observed_at: DateTime<Utc>,
    ) -> SaveFut<'a>;

    /// Most recent records for `user_id`, newest first.
    fn history<'a>(&'a self, user_id: &'a UserId, limit: usize) -> HistoryFut<'a>;
}

/// Sink used when the document store was never initialized.
#[derive(Debug, Clone)]
pub struct NotConfiguredStore {
    reason: String,
}

impl NotConfiguredStore {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl PersistenceSink for NotConfiguredStore {
    fn name(&self) -> &'static str {
        "not-configured"
    }

    fn save<'a>(
        &'a self,
        user_id: &'a UserId,
        _record: &'a NutritionRecord,
        _observed_at: DateTime<Utc>,
    ) -> SaveFut<'a> {
        Box::pin(async move {
            tracing::debug!(
                user_id = %user_id,
                reason = %self.reason,
                "Store not configured; skipping save"
            );
            Ok(SaveReceipt::Skipped)
        })
    }

    fn history<'a>(&'a self, _user_id: &'a UserId, _limit: usize) -> HistoryFut<'a> {
        Box::pin(async { Ok(Vec::new()) })
    }
}
