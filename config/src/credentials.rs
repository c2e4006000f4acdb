//! Document-store credential resolution.
//!
//! Inline JSON (raw or base64) always wins over a file path; resolution never
//! falls through to the path when inline credentials are present but broken.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone)]
pub enum CredentialSource {
    /// Service-account JSON as given, possibly base64 encoded.
    InlineJson(String),
    Path(PathBuf),
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::InlineJson(_) => f.write_str("InlineJson([REDACTED])"),
            CredentialSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct StoreCredentials {
    pub project_id: String,
    /// Pre-minted OAuth bearer token. Emulators accept requests without one.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("project_id", &self.project_id)
            .field(
                "access_token",
                &if self.access_token.is_some() { "[REDACTED]" } else { "None" },
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credentials at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credentials are not valid JSON: {0}")]
    InvalidJson(String),
    #[error("credentials have no project_id")]
    MissingProjectId,
}

pub fn resolve_credentials(source: &CredentialSource) -> Result<StoreCredentials, CredentialError> {
    let json = match source {
        CredentialSource::InlineJson(raw) => decode_inline(raw),
        CredentialSource::Path(path) => {
            std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
                path: path.clone(),
                source,
            })?
        }
    };

    let credentials: StoreCredentials =
        serde_json::from_str(&json).map_err(|e| CredentialError::InvalidJson(e.to_string()))?;
    if credentials.project_id.trim().is_empty() {
        return Err(CredentialError::MissingProjectId);
    }
    Ok(credentials)
}

/// Inline values that start with `{` are raw JSON; anything else is tried as base64.
fn decode_inline(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }
    STANDARD
        .decode(trimmed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| trimmed.to_string())
}
