//! Backend client errors.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The REST API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The auth API rejected the request.
    #[error("{0}")]
    Auth(String),

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The client was built with an unusable URL or key.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SupabaseError {
    /// Message suitable for showing to a user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Auth(message) => message.clone(),
            Self::Http(_) => "Could not reach the server. Please try again.".to_owned(),
            Self::Parse(_) | Self::InvalidConfig(_) => "Unexpected server response.".to_owned(),
        }
    }
}

/// Error body shapes returned by PostgREST and GoTrue.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message from a raw error body.
    pub(crate) fn extract(raw: &str) -> String {
        let parsed: Self = serde_json::from_str(raw).unwrap_or_default();
        parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| raw.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_message_fields() {
        assert_eq!(
            ErrorBody::extract(r#"{"code":"23505","message":"duplicate key"}"#),
            "duplicate key"
        );
        assert_eq!(
            ErrorBody::extract(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            "Invalid login credentials"
        );
        assert_eq!(ErrorBody::extract(r#"{"msg":"Email not confirmed"}"#), "Email not confirmed");
        assert_eq!(ErrorBody::extract("bad gateway"), "bad gateway");
    }
}
