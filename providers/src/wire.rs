//! Typed Gemini `generateContent` response.

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub candidates: Option<Vec<Candidate>>,
    pub error: Option<ErrorInfo>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
    /// Whether this is thinking content
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorInfo {
    pub message: Option<String>,
    pub code: Option<u16>,
}

impl ErrorInfo {
    #[must_use]
    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("Unknown error")
    }
}

/// Known Gemini finish reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    ImageSafety,
    Other,
    Unknown,
}

impl FinishReason {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "LANGUAGE" => Self::Language,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            "IMAGE_SAFETY" => Self::ImageSafety,
            "OTHER" => Self::Other,
            _ => Self::Unknown,
        }
    }

    /// Returns error message if this is an error reason, None if success.
    #[must_use]
    pub fn error_message(self) -> Option<&'static str> {
        match self {
            Self::Stop | Self::MaxTokens | Self::Unknown => None,
            Self::Safety => Some("Content filtered by safety settings"),
            Self::Recitation => Some("Response blocked: recitation"),
            Self::Language => Some("Unsupported language"),
            Self::Blocklist => Some("Content blocked by blocklist"),
            Self::ProhibitedContent => Some("Prohibited content"),
            Self::Spii => Some("Sensitive personal information detected"),
            Self::ImageSafety => Some("Image filtered by safety settings"),
            Self::Other => Some("Generation stopped for an unspecified reason"),
        }
    }
}
