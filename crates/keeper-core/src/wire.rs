//! Request and response shapes of the secret RPC surface.
//!
//! Both sides serialize these as JSON-RPC params and results. `content`
//! fields always hold payload-codec ciphertext and travel base64-encoded;
//! the server stores them without looking inside.

use crate::types::{OwnerId, SecretId, SecretType, VersionStamp};
use serde::{Deserialize, Serialize};

/// Method names.
pub mod methods {
    pub const CREATE_SECRET: &str = "secret.create";
    pub const GET_SECRET: &str = "secret.get";
    pub const EDIT_SECRET: &str = "secret.edit";
    pub const DELETE_SECRET: &str = "secret.delete";
    pub const LIST_SECRETS_BY_TYPE: &str = "secret.list_by_type";
    pub const PING: &str = "ping";
    pub const SYSTEM_INFO: &str = "system.info";
}

/// JSON-RPC error codes shared by client and server.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const UNAUTHENTICATED: i32 = -32001;
    pub const NOT_FOUND: i32 = -32002;
    pub const VERSION_CONFLICT: i32 = -32003;
}

/// Parameters of `secret.create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

/// Envelope returned by `secret.create` and `secret.edit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretHeader {
    pub id: SecretId,
    pub title: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub created_at: VersionStamp,
    pub updated_at: VersionStamp,
}

/// Result of `secret.create`.
pub type CreateSecretResponse = SecretHeader;

/// Result of `secret.edit`.
pub type EditSecretResponse = SecretHeader;

/// Parameters of `secret.get`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetSecretRequest {
    pub id: SecretId,
}

/// Result of `secret.get`.
///
/// Soft-deleted secrets are still returned with `is_deleted` set; the client
/// decides what that means for the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSecretResponse {
    pub id: SecretId,
    pub title: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    pub created_at: VersionStamp,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

/// Parameters of `secret.edit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditSecretRequest {
    pub id: SecretId,
    pub title: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// The `updated_at` the caller last saw. Must match unless `force`.
    pub known_updated_at: VersionStamp,
    #[serde(default)]
    pub force: bool,
}

/// Parameters of `secret.delete`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteSecretRequest {
    pub id: SecretId,
}

/// Result of `secret.delete`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeleteSecretResponse {}

/// Parameters of `secret.list_by_type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListSecretsByTypeRequest {
    #[serde(rename = "type_id")]
    pub secret_type: SecretType,
}

/// One row of a `secret.list_by_type` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretListEntry {
    pub id: SecretId,
    pub owner: OwnerId,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub title: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    pub created_at: VersionStamp,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

/// Result of `secret.list_by_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSecretsByTypeResponse {
    #[serde(default)]
    pub secrets: Vec<SecretListEntry>,
}

/// Serde adapter carrying `Vec<u8>` as standard base64.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::stamp;

    #[test]
    fn test_content_travels_as_base64() {
        let request = CreateSecretRequest {
            title: "note".to_string(),
            secret_type: SecretType::Text,
            content: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["content"], "3q2+7w==");
        assert_eq!(value["type"], 2);
    }

    #[test]
    fn test_edit_request_force_defaults_false() {
        let known = stamp::now();
        let value = serde_json::json!({
            "id": 1,
            "title": "note",
            "type": 2,
            "content": "",
            "known_updated_at": known,
        });
        let request: EditSecretRequest = serde_json::from_value(value).unwrap();
        assert!(!request.force);
        assert_eq!(request.known_updated_at, known);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let value = serde_json::json!({
            "title": "note",
            "type": 2,
            "content": "not base64!",
        });
        assert!(serde_json::from_value::<CreateSecretRequest>(value).is_err());
    }

    #[test]
    fn test_list_request_uses_type_id() {
        let request: ListSecretsByTypeRequest =
            serde_json::from_value(serde_json::json!({"type_id": 4})).unwrap();
        assert_eq!(request.secret_type, SecretType::Card);
    }
}
