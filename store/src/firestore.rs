//! Firestore REST document store.
//!
//! Writes go to
//! `POST {base}/projects/{project}/databases/(default)/documents/{collection}?documentId={uuid}`
//! and history is read through `:runQuery`.
//!
//! The public endpoint is only used with a bearer token. Without one the
//! store must point at an emulator or an authenticating proxy.
//!
//! The history query filters on `user_id` and orders by `timestamp`, which
//! needs a composite index on `(user_id ASC, timestamp DESC)` in the target
//! collection. Firestore answers 400 `FAILED_PRECONDITION` until it exists.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nutrilens_providers::{http_client_with_timeout, read_capped_error_body};
use nutrilens_types::{ApiKey, HistoryEntry, InitError, NutritionRecord, RecordId, UserId};
use serde_json::{Value, json};

use crate::value::{decode_document, encode_document};
use crate::{HistoryFut, PersistError, PersistenceSink, SaveFut, SaveReceipt};

pub const FIRESTORE_API_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_COLLECTION: &str = "food_logs";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub access_token: Option<ApiKey>,
    pub base_url: String,
    pub collection: String,
    pub timeout: Duration,
}

impl FirestoreConfig {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            access_token: None,
            base_url: FIRESTORE_API_BASE_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: Option<ApiKey>) -> Self {
        self.access_token = token;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    access_token: Option<ApiKey>,
    documents_url: String,
    collection: String,
    timeout: Duration,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, InitError> {
        let invalid = |message: String| InitError::Invalid {
            subsystem: "document store",
            message,
        };

        let project_id = config.project_id.trim();
        if project_id.is_empty() {
            return Err(invalid("project_id is empty".to_string()));
        }
        let collection = config.collection.trim();
        if collection.is_empty() || collection.contains('/') {
            return Err(invalid(format!(
                "collection '{}' is not a single path segment",
                config.collection
            )));
        }

        let base = config.base_url.trim_end_matches('/');
        if config.access_token.is_none() && base == FIRESTORE_API_BASE_URL {
            return Err(invalid(
                "no access_token for the public Firestore endpoint; \
                 set one in the credentials or point the store at an emulator"
                    .to_string(),
            ));
        }

        let client = http_client_with_timeout(config.timeout)
            .map_err(|e| invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            access_token: config.access_token,
            documents_url: format!("{base}/projects/{project_id}/databases/(default)/documents"),
            collection: collection.to_string(),
            timeout: config.timeout,
        })
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PersistError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| PersistError::from_reqwest(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(PersistError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn write(
        &self,
        user_id: &UserId,
        record: &NutritionRecord,
        observed_at: DateTime<Utc>,
    ) -> Result<SaveReceipt, PersistError> {
        let document_id = uuid::Uuid::new_v4().simple().to_string();
        let url = format!("{}/{}", self.documents_url, self.collection);
        let body = encode_document(user_id, record, observed_at);

        let request = self
            .client
            .post(&url)
            .query(&[("documentId", document_id.as_str())])
            .json(&body);
        self.send(request).await?;

        tracing::debug!(
            user_id = %user_id,
            record_id = %document_id,
            collection = %self.collection,
            "Stored nutrition record"
        );
        Ok(SaveReceipt::Written(RecordId::new(document_id)))
    }

    async fn query(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, PersistError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "user_id" },
                        "op": "EQUAL",
                        "value": { "stringValue": user_id.as_str() }
                    }
                },
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }
        });

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| PersistError::Decode(e.to_string()))?;

        // Rows without a document only carry readTime.
        let mut entries = Vec::with_capacity(rows.len());
        for document in rows.iter().filter_map(|row| row.get("document")) {
            match decode_document(document) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    tracing::warn!(
                        user_id = %user_id,
                        reason = %reason,
                        "Skipping undecodable history document"
                    );
                }
            }
        }
        Ok(entries)
    }
}

impl PersistenceSink for FirestoreStore {
    fn name(&self) -> &'static str {
        "firestore"
    }

    fn save<'a>(
        &'a self,
        user_id: &'a UserId,
        record: &'a NutritionRecord,
        observed_at: DateTime<Utc>,
    ) -> SaveFut<'a> {
        Box::pin(self.write(user_id, record, observed_at))
    }

    fn history<'a>(&'a self, user_id: &'a UserId, limit: usize) -> HistoryFut<'a> {
        Box::pin(self.query(user_id, limit))
    }
}
