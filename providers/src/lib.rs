//! Vision classifier clients and shared HTTP plumbing.
//!
//! # Architecture
//!
//! - [`VisionClassifier`] - object-safe seam the engine calls once per request
//! - [`gemini`] - Google Gemini adapter (GenerateContent API, inline image data)
//! - [`reply`] - narrow extraction of the nutrition JSON object from free-text replies
//! - [`NotConfiguredClassifier`] - stand-in used when no API key is available
//!
//! # Error Handling
//!
//! Classifiers never return `Err`. Every transport, credential, or parse problem is
//! folded into [`ClassificationOutcome::Failure`] so the caller can always fall back.
//! No retries happen at this layer.

pub mod gemini;
pub mod reply;
mod wire;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use nutrilens_types::{ClassificationFailure, ClassificationOutcome};

pub use nutrilens_types;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONNECT_TIMEOUT_SECS: u64 = 5;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Classification future type alias.
pub type ClassifyFut<'a> = Pin<Box<dyn Future<Output = ClassificationOutcome> + Send + 'a>>;

/// Image bytes handed to a classifier, already validated by intake.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierImage<'a> {
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

/// External capability that maps an image to a nutrition estimate.
pub trait VisionClassifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn classify<'a>(&'a self, image: ClassifierImage<'a>) -> ClassifyFut<'a>;
}

/// Classifier used when the vision capability has no credentials.
///
/// Every call fails immediately with [`ClassificationFailure::NotConfigured`].
#[derive(Debug, Clone)]
pub struct NotConfiguredClassifier {
    reason: String,
}

impl NotConfiguredClassifier {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl VisionClassifier for NotConfiguredClassifier {
    fn name(&self) -> &'static str {
        "not-configured"
    }

    fn classify<'a>(&'a self, _image: ClassifierImage<'a>) -> ClassifyFut<'a> {
        Box::pin(async move {
            ClassificationOutcome::Failure(ClassificationFailure::NotConfigured(
                self.reason.clone(),
            ))
        })
    }
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_static(concat!("nutrilens/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

/// Build a client whose requests are bounded by `timeout` end to end.
pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder().timeout(timeout).build()
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Map a reqwest send error onto the classification taxonomy.
pub(crate) fn transport_failure(
    error: &reqwest::Error,
    timeout: Duration,
) -> ClassificationFailure {
    if error.is_timeout() {
        ClassificationFailure::Timeout(timeout)
    } else {
        ClassificationFailure::Transport(error.to_string())
    }
}
