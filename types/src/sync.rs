use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failed,
}

/// Outcome of forwarding metrics to the fitness collaborator.
///
/// Created by the sync adapter and embedded read-only in the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    status: SyncStatus,
    detail: Map<String, Value>,
}

impl SyncOutcome {
    /// Successful sync; `detail.synced_payload` echoes what was sent.
    #[must_use]
    pub fn success(payload: Value) -> Self {
        let mut detail = Map::new();
        detail.insert("synced_payload".to_string(), payload);
        Self {
            status: SyncStatus::Success,
            detail,
        }
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        let mut detail = Map::new();
        detail.insert("error".to_string(), Value::String(reason.into()));
        Self {
            status: SyncStatus::Failed,
            detail,
        }
    }

    #[must_use]
    pub const fn status(&self) -> SyncStatus {
        self.status
    }

    #[must_use]
    pub fn detail(&self) -> &Map<String, Value> {
        &self.detail
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, SyncStatus::Success)
    }
}
