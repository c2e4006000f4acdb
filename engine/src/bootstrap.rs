//! Construction of the pipeline's collaborators from resolved settings.
//!
//! A subsystem that cannot be initialized is replaced by its not-configured
//! stand-in. Each decision is logged once here and nowhere else.

use std::sync::Arc;

use nutrilens_config::{CredentialError, Settings, resolve_credentials};
use nutrilens_fitness::{FitnessSync, HttpFitnessConfig, HttpFitnessPlatform, MockFitnessPlatform};
use nutrilens_providers::gemini::{GeminiClassifier, GeminiConfig};
use nutrilens_providers::{NotConfiguredClassifier, VisionClassifier};
use nutrilens_store::{FirestoreConfig, FirestoreStore, NotConfiguredStore, PersistenceSink};
use nutrilens_types::{ApiKey, InitError};

use crate::AnalysisOrchestrator;

#[must_use]
pub fn build_orchestrator(settings: &Settings) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(
        build_classifier(settings),
        build_store(settings),
        build_fitness(settings),
    )
    .with_timeouts(settings.timeouts)
}

#[must_use]
pub fn build_classifier(settings: &Settings) -> Arc<dyn VisionClassifier> {
    let vision = &settings.vision;
    let mut config =
        GeminiConfig::new(vision.api_key.clone()).with_timeout(settings.timeouts.classify);
    if let Some(model) = &vision.model {
        config = config.with_model(model.clone());
    }
    if let Some(base_url) = &vision.base_url {
        config = config.with_base_url(base_url.clone());
    }
    let model = config.model.clone();

    match GeminiClassifier::new(config) {
        Ok(classifier) => {
            tracing::info!(subsystem = "vision", model = %model, "Vision classifier configured");
            Arc::new(classifier)
        }
        Err(e) => {
            tracing::warn!(
                subsystem = "vision",
                reason = %e,
                "Vision classifier unavailable; every analysis will use the fallback estimate"
            );
            Arc::new(NotConfiguredClassifier::new(e.to_string()))
        }
    }
}

#[must_use]
pub fn build_store(settings: &Settings) -> Arc<dyn PersistenceSink> {
    match firestore(settings) {
        Ok(store) => {
            tracing::info!(
                subsystem = "store",
                collection = store.collection(),
                "Document store configured"
            );
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                subsystem = "store",
                reason = %e,
                "Document store unavailable; records will not be saved"
            );
            Arc::new(NotConfiguredStore::new(e.to_string()))
        }
    }
}

fn firestore(settings: &Settings) -> Result<FirestoreStore, InitError> {
    let store = &settings.store;
    let source = store
        .credentials
        .as_ref()
        .ok_or(InitError::NotConfigured("document store credentials"))?;
    let credentials = resolve_credentials(source).map_err(|e: CredentialError| InitError::Invalid {
        subsystem: "document store",
        message: e.to_string(),
    })?;

    let mut config = FirestoreConfig::new(credentials.project_id)
        .with_access_token(credentials.access_token.and_then(ApiKey::new))
        .with_timeout(settings.timeouts.persist);
    if let Some(base_url) = &store.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(collection) = &store.collection {
        config = config.with_collection(collection.clone());
    }
    FirestoreStore::new(config)
}

#[must_use]
pub fn build_fitness(settings: &Settings) -> Arc<dyn FitnessSync> {
    let fitness = &settings.fitness;
    let Some(endpoint) = &fitness.endpoint else {
        let platform = fitness
            .platform
            .clone()
            .map_or_else(MockFitnessPlatform::default, MockFitnessPlatform::new);
        tracing::info!(
            subsystem = "fitness",
            platform = platform.platform(),
            "Using mock fitness platform"
        );
        return Arc::new(platform);
    };

    let mut config = HttpFitnessConfig::new(endpoint.clone())
        .with_token(fitness.token.clone())
        .with_timeout(settings.timeouts.sync);
    if let Some(platform) = &fitness.platform {
        config = config.with_platform(platform.clone());
    }

    match HttpFitnessPlatform::new(config) {
        Ok(platform) => {
            tracing::info!(
                subsystem = "fitness",
                platform = platform.platform(),
                "Fitness platform configured"
            );
            Arc::new(platform)
        }
        Err(e) => {
            tracing::warn!(
                subsystem = "fitness",
                reason = %e,
                "Fitness endpoint rejected; using mock platform"
            );
            Arc::new(MockFitnessPlatform::default())
        }
    }
}
