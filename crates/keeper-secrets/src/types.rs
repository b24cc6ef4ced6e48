//! Typed secret records held by the client cache.
//!
//! A record joins decrypted content with the envelope fields the server
//! manages. Binary secrets never become records.

use keeper_core::{SecretId, SecretString, SecretType, VersionStamp};

use crate::content::{Card, LoginPassword, SecretContent, Text};
use crate::error::{Result, SecretError};

/// Server-managed fields of a record, taken from the listing rather than the
/// decrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEnvelope {
    pub id: SecretId,
    pub title: String,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

/// A decrypted login/password secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPasswordSecret {
    pub id: SecretId,
    pub title: String,
    pub login: String,
    pub password: SecretString,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

/// A decrypted text secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSecret {
    pub id: SecretId,
    pub title: String,
    pub text: SecretString,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

/// A decrypted card secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSecret {
    pub id: SecretId,
    pub title: String,
    pub card_number: SecretString,
    pub cvv: SecretString,
    pub expiry: String,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

/// Any cacheable secret record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedSecret {
    LoginPassword(LoginPasswordSecret),
    Text(TextSecret),
    Card(CardSecret),
}

impl CachedSecret {
    /// Join decrypted content with its envelope.
    ///
    /// Fails for binary content, which is never cached.
    pub fn from_content(envelope: RecordEnvelope, content: SecretContent) -> Result<Self> {
        let RecordEnvelope {
            id,
            title,
            updated_at,
            is_deleted,
        } = envelope;

        let record = match content {
            SecretContent::LoginPassword(LoginPassword { login, password }) => {
                Self::LoginPassword(LoginPasswordSecret {
                    id,
                    title,
                    login,
                    password,
                    updated_at,
                    is_deleted,
                })
            }
            SecretContent::Text(Text { text }) => Self::Text(TextSecret {
                id,
                title,
                text,
                updated_at,
                is_deleted,
            }),
            SecretContent::Card(Card {
                card_number,
                cvv,
                expiry,
            }) => Self::Card(CardSecret {
                id,
                title,
                card_number,
                cvv,
                expiry,
                updated_at,
                is_deleted,
            }),
            SecretContent::Binary(_) => {
                return Err(SecretError::InvalidContent {
                    secret_type: SecretType::Binary,
                    reason: "binary secrets are not cacheable".to_string(),
                })
            }
        };
        Ok(record)
    }

    /// A blanked record of `secret_type` that only remembers it was deleted.
    ///
    /// Returns `None` for non-cacheable types.
    pub fn tombstone(
        secret_type: SecretType,
        id: SecretId,
        updated_at: VersionStamp,
    ) -> Option<Self> {
        let record = match secret_type {
            SecretType::LoginPassword => Self::LoginPassword(LoginPasswordSecret {
                id,
                title: String::new(),
                login: String::new(),
                password: SecretString::default(),
                updated_at,
                is_deleted: true,
            }),
            SecretType::Text => Self::Text(TextSecret {
                id,
                title: String::new(),
                text: SecretString::default(),
                updated_at,
                is_deleted: true,
            }),
            SecretType::Card => Self::Card(CardSecret {
                id,
                title: String::new(),
                card_number: SecretString::default(),
                cvv: SecretString::default(),
                expiry: String::new(),
                updated_at,
                is_deleted: true,
            }),
            SecretType::Binary => return None,
        };
        Some(record)
    }

    /// Blank this record in place, keeping its id and stamp.
    pub fn into_tombstone(self) -> Self {
        let (secret_type, id, updated_at) = (self.secret_type(), self.id(), self.updated_at());
        // cacheable by construction
        Self::tombstone(secret_type, id, updated_at).unwrap_or(self)
    }

    pub fn id(&self) -> SecretId {
        match self {
            Self::LoginPassword(s) => s.id,
            Self::Text(s) => s.id,
            Self::Card(s) => s.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::LoginPassword(s) => &s.title,
            Self::Text(s) => &s.title,
            Self::Card(s) => &s.title,
        }
    }

    pub fn updated_at(&self) -> VersionStamp {
        match self {
            Self::LoginPassword(s) => s.updated_at,
            Self::Text(s) => s.updated_at,
            Self::Card(s) => s.updated_at,
        }
    }

    pub fn is_deleted(&self) -> bool {
        match self {
            Self::LoginPassword(s) => s.is_deleted,
            Self::Text(s) => s.is_deleted,
            Self::Card(s) => s.is_deleted,
        }
    }

    pub fn secret_type(&self) -> SecretType {
        match self {
            Self::LoginPassword(_) => SecretType::LoginPassword,
            Self::Text(_) => SecretType::Text,
            Self::Card(_) => SecretType::Card,
        }
    }
}
