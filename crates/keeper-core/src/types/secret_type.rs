//! Secret type discriminator.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of secret, carried as a small integer on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecretType {
    /// Login and password pair.
    LoginPassword = 1,

    /// Free-form text.
    Text = 2,

    /// Arbitrary file content. Never cached client-side.
    Binary = 3,

    /// Payment card.
    Card = 4,
}

impl SecretType {
    /// Types the client keeps in its local cache.
    pub const CACHEABLE: [SecretType; 3] = [Self::LoginPassword, Self::Text, Self::Card];

    /// All known types.
    pub fn all() -> &'static [SecretType] {
        &[Self::LoginPassword, Self::Text, Self::Binary, Self::Card]
    }

    /// Numeric wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether secrets of this type are held in the client cache.
    pub const fn is_cacheable(self) -> bool {
        !matches!(self, Self::Binary)
    }

    /// Short machine-friendly name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginPassword => "login-password",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SecretType> for u8 {
    fn from(t: SecretType) -> Self {
        t.code()
    }
}

impl TryFrom<u8> for SecretType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::LoginPassword),
            2 => Ok(Self::Text),
            3 => Ok(Self::Binary),
            4 => Ok(Self::Card),
            other => Err(Error::UnknownSecretType(other)),
        }
    }
}

impl FromStr for SecretType {
    type Err = Error;

    /// Accepts either the numeric code or the short name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Self::try_from(code);
        }
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or(Error::UnknownSecretType(0))
    }
}
