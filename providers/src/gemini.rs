//! Google Gemini vision adapter.
//!
//! Sends one non-streaming `generateContent` request per image:
//! the fixed [`NUTRITION_PROMPT`] plus the image as `inline_data`.
//!
//! Note: Gemini API uses mixed casing:
//! - `inline_data` / `mime_type` (snake_case) inside parts
//! - `generationConfig` / `responseMimeType` (camelCase)

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use nutrilens_types::{ApiKey, ClassificationFailure, ClassificationOutcome, InitError};
use serde_json::{Value, json};

use crate::reply::{ReplyParseError, extract_nutrition};
use crate::wire::{self, FinishReason};
use crate::{
    ClassifierImage, ClassifyFut, GEMINI_API_BASE_URL, VisionClassifier,
    http_client_with_timeout, read_capped_error_body, transport_failure,
};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Instruction sent alongside every image.
pub const NUTRITION_PROMPT: &str = "\
You are a nutrition analyst. Identify the main food or meal in the image and estimate \
its nutrition for the visible portion.

Respond with ONLY a JSON object, no markdown and no commentary, with exactly these fields:
{
  \"food_name\": string,
  \"calories\": number,
  \"protein_g\": number,
  \"carbs_g\": number,
  \"fats_g\": number,
  \"confidence\": number between 0 and 1
}

All numbers must be non-negative. If the image does not show food, respond with \
{\"error\": \"<short reason>\"} instead.";

/// Connection settings for the Gemini adapter.
///
/// `api_key: None` is the not-configured case and makes [`GeminiClassifier::new`]
/// return [`InitError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    #[must_use]
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: ApiKey,
    url: String,
    model: String,
    timeout: Duration,
}

impl GeminiClassifier {
    pub fn new(config: GeminiConfig) -> Result<Self, InitError> {
        let api_key = config
            .api_key
            .ok_or(InitError::NotConfigured("vision API key"))?;

        let model = config.model.trim();
        if model.is_empty() {
            return Err(InitError::Invalid {
                subsystem: "vision",
                message: "model name is empty".to_string(),
            });
        }

        let client = http_client_with_timeout(config.timeout).map_err(|e| InitError::Invalid {
            subsystem: "vision",
            message: format!("HTTP client: {e}"),
        })?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            api_key,
            url: format!("{base}/models/{model}:generateContent"),
            model: model.to_string(),
            timeout: config.timeout,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn classify_image(&self, image: ClassifierImage<'_>) -> ClassificationOutcome {
        let body = build_request_body(image);

        let response = match self
            .client
            .post(&self.url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(&e, self.timeout).into(),
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = read_capped_error_body(response).await;
            return ClassificationFailure::ApiStatus {
                status: status.as_u16(),
                body: error_text,
            }
            .into();
        }

        let payload: wire::Response = match response.json().await {
            Ok(payload) => payload,
            Err(e) if e.is_timeout() => {
                return ClassificationFailure::Timeout(self.timeout).into();
            }
            Err(e) => {
                return ClassificationFailure::Transport(format!("invalid response body: {e}"))
                    .into();
            }
        };

        let text = match reply_text(payload) {
            Ok(text) => text,
            Err(failure) => return failure.into(),
        };
        tracing::debug!(model = %self.model, reply_bytes = text.len(), "Gemini reply received");

        match extract_nutrition(&text) {
            Ok(raw) => ClassificationOutcome::Success(raw),
            Err(ReplyParseError::ClassifierError(message)) => {
                ClassificationFailure::ClassifierError(message).into()
            }
            Err(e) => ClassificationFailure::Unparseable(e.to_string()).into(),
        }
    }
}

impl VisionClassifier for GeminiClassifier {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn classify<'a>(&'a self, image: ClassifierImage<'a>) -> ClassifyFut<'a> {
        Box::pin(self.classify_image(image))
    }
}

fn build_request_body(image: ClassifierImage<'_>) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": NUTRITION_PROMPT },
                {
                    "inline_data": {
                        "mime_type": image.mime_type,
                        "data": BASE64.encode(image.bytes)
                    }
                }
            ]
        }],
        "generationConfig": {
            "temperature": 0.2,
            "responseMimeType": "application/json"
        }
    })
}

/// Concatenate the visible text of the first candidate.
fn reply_text(response: wire::Response) -> Result<String, ClassificationFailure> {
    if let Some(error) = response.error {
        return Err(ClassificationFailure::ApiStatus {
            status: error.code.unwrap_or(500),
            body: error.message_or_default().to_string(),
        });
    }

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ClassificationFailure::Blocked(format!(
            "prompt blocked: {reason}"
        )));
    }

    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or(ClassificationFailure::EmptyReply)?;

    if let Some(message) = candidate
        .finish_reason
        .as_deref()
        .map(FinishReason::parse)
        .and_then(FinishReason::error_message)
    {
        return Err(ClassificationFailure::Blocked(message.to_string()));
    }

    let text: String = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        return Err(ClassificationFailure::EmptyReply);
    }
    Ok(text)
}
