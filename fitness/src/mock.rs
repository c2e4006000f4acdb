use chrono::Utc;
use nutrilens_types::{SyncOutcome, UserId};

use crate::{DEFAULT_PLATFORM, FitnessSync, SyncFut, build_payload};

/// Platform that accepts everything and logs what would have been sent.
#[derive(Debug, Clone)]
pub struct MockFitnessPlatform {
    platform: String,
}

impl MockFitnessPlatform {
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }
}

impl Default for MockFitnessPlatform {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM)
    }
}

impl FitnessSync for MockFitnessPlatform {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn sync<'a>(&'a self, user_id: &'a UserId, calories: f64, protein_g: f64) -> SyncFut<'a> {
        Box::pin(async move {
            let payload = build_payload(&self.platform, user_id, calories, protein_g, Utc::now());
            tracing::info!(
                platform = %self.platform,
                user_id = %user_id,
                payload = %payload,
                "Mock fitness sync"
            );
            SyncOutcome::success(payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use nutrilens_types::{SyncStatus, UserId};

    use super::MockFitnessPlatform;
    use crate::FitnessSync;

    #[tokio::test]
    async fn mock_always_succeeds_and_echoes() {
        let platform = MockFitnessPlatform::default();
        let user = UserId::parse("demo_user").unwrap();
        let outcome = platform.sync(&user, 320.0, 11.0).await;

        assert_eq!(outcome.status(), SyncStatus::Success);
        let payload = &outcome.detail()["synced_payload"];
        assert_eq!(payload["platform"], "FitnessMock Basic");
        assert_eq!(payload["metrics"]["calories_consumed"], 320.0);
        assert_eq!(payload["metrics"]["protein_g"], 11.0);
    }

    #[test]
    fn custom_platform_tag() {
        assert_eq!(MockFitnessPlatform::new("Strava").platform(), "Strava");
    }
}
