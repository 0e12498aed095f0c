//! Error taxonomy shared by every crate in the workspace.

use thiserror::Error;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing credential or settings required to talk to the provider.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider rejected a token exchange or refresh.
    #[error("Upstream auth error: {0}")]
    UpstreamAuth(String),

    /// A list call to the provider failed.
    #[error("{}", upstream_request_message(.status, .message))]
    UpstreamRequest {
        status: Option<u16>,
        message: String,
    },

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Encryption or decryption of stored secrets failed.
    #[error("Secret handling failed: {0}")]
    Secret(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

fn upstream_request_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Upstream request failed ({}): {}", code, message),
        None => format!("Upstream request failed: {}", message),
    }
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn upstream_auth(message: impl Into<String>) -> Self {
        Self::UpstreamAuth(message.into())
    }

    pub fn upstream_request(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UpstreamRequest {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}
