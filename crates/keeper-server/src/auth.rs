//! Bearer token resolution.
//!
//! Registration, login, and token issuance live outside this server; all it
//! needs is a way to turn a presented token into an owner.

use keeper_core::{AuthContext, OwnerId};
use std::collections::HashMap;

/// Resolves a bearer token to the identity it authenticates.
pub trait TokenResolver: Send + Sync {
    /// `None` when the token is unknown or invalid.
    fn resolve(&self, token: &str) -> Option<AuthContext>;
}

/// Fixed token to owner table, typically loaded from `server.tokens`.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, OwnerId>,
}

impl StaticTokenResolver {
    /// Create an empty resolver that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `owner`.
    pub fn with_token(mut self, token: impl Into<String>, owner: impl Into<OwnerId>) -> Self {
        self.tokens.insert(token.into(), owner.into());
        self
    }

    /// Number of configured tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<&HashMap<String, String>> for StaticTokenResolver {
    fn from(tokens: &HashMap<String, String>) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|(token, owner)| (token.clone(), OwnerId::new(owner.clone())))
                .collect(),
        }
    }
}

impl TokenResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> Option<AuthContext> {
        self.tokens
            .get(token)
            .map(|owner| AuthContext::new(owner.clone()))
    }
}
