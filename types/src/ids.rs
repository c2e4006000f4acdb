use std::fmt;

use thiserror::Error;

const MAX_USER_ID_LEN: usize = 128;

/// Opaque id of one persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUserId {
    #[error("user id must not be empty")]
    Empty,
    #[error("user id exceeds {MAX_USER_ID_LEN} characters")]
    TooLong,
    #[error("user id must not contain '/'")]
    PathSeparator,
}

/// Caller-supplied user identifier, stored as the `user_id` field of each record.
///
/// Ids are addressed as one URL path segment by `GET /history/{user_id}`, so
/// `/` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, InvalidUserId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidUserId::Empty);
        }
        if trimmed.chars().count() > MAX_USER_ID_LEN {
            return Err(InvalidUserId::TooLong);
        }
        if trimmed.contains('/') {
            return Err(InvalidUserId::PathSeparator);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidUserId, UserId};

    #[test]
    fn user_id_is_trimmed() {
        assert_eq!(UserId::parse("  demo_user ").unwrap().as_str(), "demo_user");
    }

    #[test]
    fn user_id_rejects_blank() {
        assert_eq!(UserId::parse(" "), Err(InvalidUserId::Empty));
    }

    #[test]
    fn user_id_rejects_path_separator() {
        assert_eq!(UserId::parse("a/b"), Err(InvalidUserId::PathSeparator));
    }

    #[test]
    fn user_id_rejects_overlong() {
        let raw = "u".repeat(129);
        assert_eq!(UserId::parse(&raw), Err(InvalidUserId::TooLong));
        assert!(UserId::parse(&"u".repeat(128)).is_ok());
    }
}
