//! Error types for the Gemini client layer

use thiserror::Error;

/// Canonical status codes returned in the Gemini error body.
///
/// The API reports these in the `error.status` field (e.g. "INVALID_ARGUMENT").
/// The gateway uses them to decide whether a failed attempt is worth retrying
/// with a different configuration, instead of matching on error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    InvalidArgument,
    FailedPrecondition,
    PermissionDenied,
    NotFound,
    ResourceExhausted,
    Unavailable,
    Internal,
    Unknown,
}

impl ApiStatus {
    /// Map the `status` string from a Gemini error body.
    pub fn from_code(code: &str) -> Self {
        match code {
            "INVALID_ARGUMENT" => ApiStatus::InvalidArgument,
            "FAILED_PRECONDITION" => ApiStatus::FailedPrecondition,
            "PERMISSION_DENIED" => ApiStatus::PermissionDenied,
            "NOT_FOUND" => ApiStatus::NotFound,
            "RESOURCE_EXHAUSTED" => ApiStatus::ResourceExhausted,
            "UNAVAILABLE" => ApiStatus::Unavailable,
            "INTERNAL" => ApiStatus::Internal,
            _ => ApiStatus::Unknown,
        }
    }

    /// Best-effort mapping when the error body carries no status field.
    pub fn from_http(status: u16) -> Self {
        match status {
            400 => ApiStatus::InvalidArgument,
            403 => ApiStatus::PermissionDenied,
            404 => ApiStatus::NotFound,
            429 => ApiStatus::ResourceExhausted,
            500 => ApiStatus::Internal,
            503 => ApiStatus::Unavailable,
            _ => ApiStatus::Unknown,
        }
    }
}

/// Errors that can occur when talking to the generation API
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was configured
    #[error("Missing API credentials (set GOOGLE_API_KEY)")]
    MissingCredentials,

    /// The API returned a structured error response
    #[error("API error (HTTP {status}, {api_status:?}): {message}")]
    Api {
        status: u16,
        api_status: ApiStatus,
        message: String,
    },

    /// Connection-level failures (DNS, TLS, timeouts)
    #[error("Transport error: {0}")]
    Transport(String),

    /// SSE stream decoding failures
    #[error("Stream error: {0}")]
    Stream(String),

    /// JSON encoding/decoding issues
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LlmError {
    /// True when the failure points at the request configuration (typically
    /// the search tool) rather than the model itself, so retrying the same
    /// model without the tool is worthwhile.
    pub fn tool_rejection(&self) -> bool {
        matches!(
            self,
            LlmError::Api {
                api_status: ApiStatus::InvalidArgument | ApiStatus::FailedPrecondition,
                ..
            }
        )
    }

    /// True when no attempt against any model can succeed.
    pub fn fatal(&self) -> bool {
        matches!(self, LlmError::MissingCredentials)
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LlmError::Api {
                status: status.as_u16(),
                api_status: ApiStatus::from_http(status.as_u16()),
                message: err.to_string(),
            },
            None => LlmError::Transport(err.to_string()),
        }
    }
}
