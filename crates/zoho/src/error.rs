//! Error types for the Zoho clients.

use expense_ledger_core::Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZohoApiError>;

#[derive(Debug, Error)]
pub enum ZohoApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Token endpoint rejected the grant or returned no usable token.
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ZohoApiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ZohoApiError> for Error {
    fn from(err: ZohoApiError) -> Self {
        match err {
            ZohoApiError::Auth(message) => Error::UpstreamAuth(message),
            other => Error::upstream_request(other.status_code(), other.to_string()),
        }
    }
}
