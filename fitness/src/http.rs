//! Fitness platform reached over HTTP: one JSON `POST` per meal.

use std::time::Duration;

use chrono::Utc;
use nutrilens_providers::{http_client_with_timeout, read_capped_error_body};
use nutrilens_types::{ApiKey, InitError, SyncOutcome, UserId};

use crate::{DEFAULT_PLATFORM, FitnessSync, SyncFut, build_payload};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpFitnessConfig {
    pub endpoint: String,
    pub platform: String,
    pub token: Option<ApiKey>,
    pub timeout: Duration,
}

impl HttpFitnessConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            platform: DEFAULT_PLATFORM.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<ApiKey>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpFitnessPlatform {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    platform: String,
    token: Option<ApiKey>,
    timeout: Duration,
}

impl HttpFitnessPlatform {
    pub fn new(config: HttpFitnessConfig) -> Result<Self, InitError> {
        let invalid = |message: String| InitError::Invalid {
            subsystem: "fitness sync",
            message,
        };

        let endpoint = reqwest::Url::parse(config.endpoint.trim())
            .map_err(|e| invalid(format!("endpoint '{}': {e}", config.endpoint)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "endpoint scheme '{}' is not http(s)",
                endpoint.scheme()
            )));
        }

        let client = http_client_with_timeout(config.timeout)
            .map_err(|e| invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            platform: config.platform,
            token: config.token,
            timeout: config.timeout,
        })
    }

    async fn post(&self, user_id: &UserId, calories: f64, protein_g: f64) -> SyncOutcome {
        let payload = build_payload(&self.platform, user_id, calories, protein_g, Utc::now());

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return SyncOutcome::failed(format!(
                    "fitness sync timed out after {}ms",
                    self.timeout.as_millis()
                ));
            }
            Err(e) => return SyncOutcome::failed(format!("fitness sync request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return SyncOutcome::failed(format!(
                "fitness platform returned {}: {body}",
                status.as_u16()
            ));
        }

        SyncOutcome::success(payload)
    }
}

impl FitnessSync for HttpFitnessPlatform {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn sync<'a>(&'a self, user_id: &'a UserId, calories: f64, protein_g: f64) -> SyncFut<'a> {
        Box::pin(self.post(user_id, calories, protein_g))
    }
}
