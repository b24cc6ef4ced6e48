//! Error types for payload handling.

use keeper_core::SecretType;
use thiserror::Error;

/// Errors that can occur while encoding, decoding, or interpreting payloads.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Ciphertext is truncated, tampered with, or sealed under another key.
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Master key error: {0}")]
    KeyResolution(String),

    /// Plaintext does not have the shape its secret type requires.
    #[error("Invalid {secret_type} content: {reason}")]
    InvalidContent {
        secret_type: SecretType,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for payload operations.
pub type Result<T> = std::result::Result<T, SecretError>;
