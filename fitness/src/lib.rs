//! Forwarding of meal metrics to a fitness platform.
//!
//! [`FitnessSync`] never fails: every problem is reported as
//! [`SyncOutcome::failed`] so the caller can embed it in the response as data.

mod http;
mod mock;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, SecondsFormat, Utc};
use nutrilens_types::{SyncOutcome, UserId};
use serde_json::{Value, json};

pub use http::{HttpFitnessConfig, HttpFitnessPlatform};
pub use mock::MockFitnessPlatform;

pub const DEFAULT_PLATFORM: &str = "FitnessMock Basic";
/// Value of the payload's `source` field.
pub const PAYLOAD_SOURCE: &str = "nutrilens";

pub type SyncFut<'a> = Pin<Box<dyn Future<Output = SyncOutcome> + Send + 'a>>;

pub trait FitnessSync: Send + Sync {
    /// Platform tag written into every payload.
    fn platform(&self) -> &str;
    fn sync<'a>(&'a self, user_id: &'a UserId, calories: f64, protein_g: f64) -> SyncFut<'a>;
}

/// Fixed-shape metrics payload sent to every platform.
#[must_use]
pub fn build_payload(
    platform: &str,
    user_id: &UserId,
    calories: f64,
    protein_g: f64,
    at: DateTime<Utc>,
) -> Value {
    json!({
        "platform": platform,
        "user_id": user_id.as_str(),
        "metrics": {
            // Consumption is reported; burn is always zero here.
            "calories_burned": 0,
            "calories_consumed": calories,
            "protein_g": protein_g,
        },
        "timestamp": at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "source": PAYLOAD_SOURCE,
    })
}
