//! Error handling for catalog API requests.

use thiserror::Error;

/// Error type for a single API request.
///
/// Each variant carries a human-readable text for end users,
/// see [ApiClientError::user_message].
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// The request could not be built, e.g. an unusable base URL or header.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The server answered with a non-success status code.
    #[error("server rejected request with status {0}")]
    ServerRejected(u16),
    /// The response body did not match the expected schema.
    #[error("failed to decode response")]
    MalformedResponse(#[source] serde_json::Error),
    /// The request did not complete at the transport level.
    #[error("request failed")]
    NetworkFailure(#[source] reqwest::Error),
}

impl ApiClientError {
    /// The text shown to users when this error ends a request.
    pub fn user_message(&self) -> String {
        match self {
            ApiClientError::InvalidRequest(_) => "Invalid URL.".to_string(),
            ApiClientError::ServerRejected(status) => format!("Request failed ({status})."),
            ApiClientError::MalformedResponse(_) => "Unable to read data.".to_string(),
            ApiClientError::NetworkFailure(_) => "Unable to reach the server.".to_string(),
        }
    }
}
