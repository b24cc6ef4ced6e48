//! Core types for SecretKeeper.

mod auth;
mod identifiers;
mod secret_type;
pub mod stamp;

pub use auth::*;
pub use identifiers::*;
pub use secret_type::*;
pub use stamp::VersionStamp;
