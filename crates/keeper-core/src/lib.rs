//! # keeper-core
//!
//! Core types, wire contracts, and configuration for SecretKeeper.
//!
//! This crate is shared by the client and the server:
//!
//! - **Types**: secret identifiers, secret types, owners, and version stamps
//! - **Wire**: JSON-RPC envelopes, request/response shapes for the secret RPC surface, and error codes
//! - **Configuration**: loading, validation, and persistence of the JSON5 config file
//! - **Utilities**: path resolution and environment handling

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod rpc;
pub mod secret;
pub mod types;
pub mod wire;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
pub use types::*;
