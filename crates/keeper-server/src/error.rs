//! Server error types.

use keeper_core::wire::codes;
use keeper_core::{SecretId, VersionStamp};
use thiserror::Error;

/// Errors raised by a [`SecretStore`](crate::store::SecretStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row with this id belongs to the caller.
    #[error("Secret {0} not found")]
    NotFound(SecretId),

    /// The caller's `known_updated_at` is stale. Nothing was written.
    #[error("Secret {id} was modified at {current}; reload before editing")]
    VersionConflict { id: SecretId, current: VersionStamp },

    /// A stored row cannot be mapped back to a secret.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to RPC callers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Method not found.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Not found error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stale version stamp on edit.
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::Json(_) => codes::PARSE_ERROR,
            Self::Auth(_) => codes::UNAUTHENTICATED,
            Self::NotFound(_) => codes::NOT_FOUND,
            Self::VersionConflict(_) => codes::VERSION_CONFLICT,
            _ => codes::INTERNAL_ERROR,
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::VersionConflict { .. } => Self::VersionConflict(err.to_string()),
            // storage detail stays in the server log
            other => {
                tracing::error!(error = %other, "secret store failure");
                Self::Internal("storage failure".to_string())
            }
        }
    }
}
