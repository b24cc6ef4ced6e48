//! Client error types.

use keeper_core::rpc::JsonRpcError;
use keeper_core::wire::codes;
use keeper_secrets::SecretError;
use thiserror::Error;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Command input is missing or malformed. Nothing was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The secret does not exist for this user, or was deleted.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Somebody else edited the secret first. Retry with `force` to override.
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// A payload could not be decrypted or parsed.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Binary secret requested through the text path or the reverse.
    #[error("Wrong method: {0}")]
    WrongMethod(String),

    /// The server rejected the bearer token.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Payload encoding or master key failure.
    #[error("Codec error: {0}")]
    Codec(#[from] SecretError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other JSON-RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Map a decrypt or parse failure of received content.
    pub(crate) fn decode(err: SecretError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<JsonRpcError> for ClientError {
    fn from(err: JsonRpcError) -> Self {
        match err.code {
            codes::NOT_FOUND => Self::NotFound(err.message),
            codes::VERSION_CONFLICT => Self::VersionConflict(err.message),
            codes::UNAUTHENTICATED => Self::Auth(err.message),
            code => Self::Rpc {
                code,
                message: err.message,
            },
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes_map_to_variants() {
        let err = ClientError::from(JsonRpcError::new(codes::NOT_FOUND, "gone"));
        assert!(matches!(err, ClientError::NotFound(m) if m == "gone"));

        let err = ClientError::from(JsonRpcError::new(codes::VERSION_CONFLICT, "stale"));
        assert!(matches!(err, ClientError::VersionConflict(_)));

        let err = ClientError::from(JsonRpcError::new(codes::UNAUTHENTICATED, "who?"));
        assert!(matches!(err, ClientError::Auth(_)));

        let err = ClientError::from(JsonRpcError::internal_error("boom"));
        assert!(matches!(err, ClientError::Rpc { code: codes::INTERNAL_ERROR, .. }));
    }
}
