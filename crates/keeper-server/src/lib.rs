//! Secret store and JSON-RPC server for SecretKeeper.
//!
//! This crate provides:
//! - The per-owner [`SecretStore`] with optimistic-concurrency edits and soft
//!   delete, backed by memory or SQLite
//! - JSON-RPC method handlers for the secret surface
//! - An Axum HTTP server with bearer-token authentication

pub mod auth;
pub mod error;
pub mod handlers;
pub mod methods;
pub mod server;
pub mod store;

pub use auth::{StaticTokenResolver, TokenResolver};
pub use error::{ServerError, StoreError};
pub use handlers::HandlerContext;
pub use methods::{CallContext, MethodHandler, MethodRegistry};
pub use server::SecretServer;
pub use store::{MemorySecretStore, SecretStore, SqliteSecretStore};

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
