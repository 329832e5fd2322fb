// File: src/resos/error.rs
// Purpose: Failure modes of a call to the resOS API

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("resOS rejected the API credentials (HTTP 401)")]
    Unauthorized,

    #[error("resOS rejected the booking data (HTTP 422): {0}")]
    Rejected(String),

    #[error("resOS returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("resOS returned an unexpected content type: {content_type}")]
    NonJson { content_type: String },

    #[error("could not reach resOS: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("could not decode the resOS response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not build the resOS HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Classify a non-success status together with the message pulled from its body
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => UpstreamError::Unauthorized,
            422 => UpstreamError::Rejected(message),
            _ => UpstreamError::Status { status, message },
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unauthorized => "unauthorized",
            UpstreamError::Rejected(_) => "rejected",
            UpstreamError::Status { .. } => "status",
            UpstreamError::NonJson { .. } => "non_json",
            UpstreamError::Connection(_) => "connection",
            UpstreamError::Decode(_) => "decode",
            UpstreamError::Client(_) => "client",
        }
    }
}
