//! Typed plaintext content of a secret.
//!
//! Only the type-specific fields travel inside the encrypted payload. The
//! envelope fields (`id`, `title`, `updated_at`, `is_deleted`) come from the
//! server record and are never trusted from decrypted bytes.

use keeper_core::{SecretString, SecretType};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SecretError};

/// Login and password pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPassword {
    pub login: String,
    pub password: SecretString,
}

/// Free-form text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: SecretString,
}

/// Payment card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub card_number: SecretString,
    pub cvv: SecretString,
    /// Expiry as entered by the user, e.g. `12/27`.
    pub expiry: String,
}

/// Plaintext content of any secret type.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretContent {
    LoginPassword(LoginPassword),
    Text(Text),
    Card(Card),
    /// Raw file bytes. Never cached.
    Binary(Vec<u8>),
}

impl SecretContent {
    /// Build login/password content.
    pub fn login_password(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self::LoginPassword(LoginPassword {
            login: login.into(),
            password: SecretString::new(password),
        })
    }

    /// Build text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Text {
            text: SecretString::new(text),
        })
    }

    /// Build card content.
    pub fn card(
        card_number: impl Into<String>,
        cvv: impl Into<String>,
        expiry: impl Into<String>,
    ) -> Self {
        Self::Card(Card {
            card_number: SecretString::new(card_number),
            cvv: SecretString::new(cvv),
            expiry: expiry.into(),
        })
    }

    /// The secret type this content belongs to.
    pub fn secret_type(&self) -> SecretType {
        match self {
            Self::LoginPassword(_) => SecretType::LoginPassword,
            Self::Text(_) => SecretType::Text,
            Self::Card(_) => SecretType::Card,
            Self::Binary(_) => SecretType::Binary,
        }
    }

    /// Serialize to the plaintext bytes handed to the payload codec.
    ///
    /// Structured types encode as JSON; binary content is passed through.
    pub fn to_plaintext(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::LoginPassword(c) => serde_json::to_vec(c)?,
            Self::Text(c) => serde_json::to_vec(c)?,
            Self::Card(c) => serde_json::to_vec(c)?,
            Self::Binary(bytes) => bytes.clone(),
        };
        Ok(bytes)
    }

    /// Parse decoded plaintext as content of `secret_type`.
    pub fn from_plaintext(secret_type: SecretType, plaintext: &[u8]) -> Result<Self> {
        let invalid = |e: serde_json::Error| SecretError::InvalidContent {
            secret_type,
            reason: e.to_string(),
        };

        let content = match secret_type {
            SecretType::LoginPassword => {
                Self::LoginPassword(serde_json::from_slice(plaintext).map_err(invalid)?)
            }
            SecretType::Text => Self::Text(serde_json::from_slice(plaintext).map_err(invalid)?),
            SecretType::Card => Self::Card(serde_json::from_slice(plaintext).map_err(invalid)?),
            SecretType::Binary => Self::Binary(plaintext.to_vec()),
        };
        Ok(content)
    }

    /// Check that every required field is filled in.
    ///
    /// The error lists all missing fields at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        match self {
            Self::LoginPassword(c) => {
                if c.login.trim().is_empty() {
                    missing.push("login");
                }
                if c.password.is_blank() {
                    missing.push("password");
                }
            }
            Self::Text(c) => {
                if c.text.is_blank() {
                    missing.push("text");
                }
            }
            Self::Card(c) => {
                if c.card_number.is_blank() {
                    missing.push("card number");
                }
                if c.cvv.is_blank() {
                    missing.push("CVV");
                }
                if c.expiry.trim().is_empty() {
                    missing.push("expiry");
                }
            }
            Self::Binary(_) => {}
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SecretError::InvalidContent {
                secret_type: self.secret_type(),
                reason: format!("{} is missing", missing.join(", ")),
            })
        }
    }
}

impl fmt::Debug for SecretContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginPassword(c) => f.debug_tuple("LoginPassword").field(c).finish(),
            Self::Text(c) => f.debug_tuple("Text").field(c).finish(),
            Self::Card(c) => f.debug_tuple("Card").field(c).finish(),
            Self::Binary(bytes) => write!(f, "Binary({} bytes)", bytes.len()),
        }
    }
}
