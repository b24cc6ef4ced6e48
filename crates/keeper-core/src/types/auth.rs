//! Authenticated caller identity.

use super::OwnerId;
use chrono::{DateTime, Utc};

/// Identity attached to a request once its token has been resolved.
///
/// Every secret operation is scoped to `owner`; nothing else about the
/// caller is consulted.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Owner the request acts on behalf of.
    pub owner: OwnerId,

    /// When authentication occurred.
    pub authenticated_at: DateTime<Utc>,
}

impl AuthContext {
    /// Create an auth context for the given owner.
    pub fn new(owner: impl Into<OwnerId>) -> Self {
        Self {
            owner: owner.into(),
            authenticated_at: Utc::now(),
        }
    }
}
