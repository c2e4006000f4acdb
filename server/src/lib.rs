//! HTTP transport for the analysis pipeline.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | liveness |
//! | `POST /analyze` | multipart upload, field `file`, optional `user_id` |
//! | `GET /history/:user_id` | most recent records for a user |

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nutrilens_engine::{AnalysisOrchestrator, AnalysisResult, HistoryError, InputError};
use serde::Deserialize;
use serde_json::{Value, json};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: Arc<AnalysisOrchestrator>,
    default_user_id: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: AnalysisOrchestrator, default_user_id: impl Into<Arc<str>>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            default_user_id: default_user_id.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/analyze", post(analyze))
        .route("/history/:user_id", get(history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Error body for every rejected request: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<InputError> for ApiError {
    fn from(error: InputError) -> Self {
        let status = match &error {
            InputError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self {
            status: error.status(),
            message: error.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "NutriLens backend is running",
    }))
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeQuery {
    user_id: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Query(query) = query?;
    let mut multipart = multipart?;
    let mut image = None;
    let mut form_user_id = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("file") => image = Some(field.bytes().await?),
            Some("user_id") => form_user_id = Some(field.text().await?),
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::bad_request("missing multipart field 'file'"))?;
    let user_id = query
        .user_id
        .or(form_user_id)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.default_user_id.to_string());

    match state.orchestrator.analyze(Vec::from(image), &user_id).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            tracing::info!(user_id = %user_id, reason = %e, "Rejected upload");
            Err(e.into())
        }
    }
}

async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let entries = match state.orchestrator.history(&user_id, HISTORY_LIMIT).await {
        Ok(entries) => entries,
        Err(HistoryError::InvalidUserId(e)) => {
            return Err(ApiError::bad_request(format!("invalid user id: {e}")));
        }
        Err(HistoryError::Store(e)) => {
            tracing::warn!(user_id = %user_id, reason = %e, "History read failed");
            Vec::new()
        }
    };

    Ok(Json(json!({
        "user_id": user_id,
        "history": entries,
    })))
}
