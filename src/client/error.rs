use serde::Serialize;
use thiserror::Error;

/// Why a call against the API did not produce server data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Tag carried by results that were served from the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "status")]
pub enum FallbackReason {
    Offline,
    Unauthorized,
    Server(u16),
    Malformed,
}

impl FallbackReason {
    /// The admin surface asks for a new login instead of only reporting
    /// "saved locally" when this is true.
    pub fn needs_login(&self) -> bool {
        matches!(self, FallbackReason::Unauthorized)
    }
}

impl From<&ApiError> for FallbackReason {
    fn from(e: &ApiError) -> Self {
        match e {
            ApiError::NetworkUnavailable(_) => FallbackReason::Offline,
            ApiError::Unauthorized => FallbackReason::Unauthorized,
            ApiError::ServerError { status, .. } => FallbackReason::Server(*status),
            ApiError::MalformedResponse(_) => FallbackReason::Malformed,
        }
    }
}
