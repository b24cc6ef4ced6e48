//! Payload encryption and typed secret content for SecretKeeper.
//!
//! Provides the AES-256-GCM payload codec shared by every client, master key
//! resolution, and the typed shapes secrets take once decrypted.

pub mod codec;
pub mod content;
pub mod error;
pub mod master_key;
pub mod types;

pub use codec::{AesGcmCodec, PayloadCodec};
pub use content::{Card, LoginPassword, SecretContent, Text};
pub use error::{Result, SecretError};
pub use types::{CachedSecret, CardSecret, LoginPasswordSecret, RecordEnvelope, TextSecret};
