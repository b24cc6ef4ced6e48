//! Client side of SecretKeeper.
//!
//! This crate provides:
//! - A type-partitioned [`SecretCache`] of decrypted secrets
//! - The [`SecretRemote`] seam and its JSON-RPC implementation
//! - A full-refresh [`SyncEngine`] with a cancellable periodic task
//! - The [`SecretService`] that encrypts, calls the remote, and resyncs
//! - [`ClientSession`], tying the above to a login

pub mod cache;
pub mod error;
pub mod remote;
pub mod service;
pub mod session;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheLookup, SecretCache};
pub use error::{ClientError, Result};
pub use remote::{HttpTransport, RpcRemote, RpcTransport, SecretRemote};
pub use service::SecretService;
pub use session::ClientSession;
pub use sync::{SkippedItem, SyncEngine, SyncHandle, SyncReport, TypeSync};
