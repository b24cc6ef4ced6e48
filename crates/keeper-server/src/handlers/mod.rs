//! RPC method handlers.

pub mod secrets;

use crate::error::ServerError;
use crate::methods::{register_builtin, MethodRegistry};
use crate::store::SecretStore;
use crate::Result;
use keeper_core::wire::methods;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub use secrets::{
    CreateSecretHandler, DeleteSecretHandler, EditSecretHandler, GetSecretHandler,
    ListSecretsByTypeHandler,
};

/// Shared context for method handlers.
#[derive(Clone)]
pub struct HandlerContext {
    /// Backing secret store.
    pub store: Arc<dyn SecretStore>,
}

impl HandlerContext {
    /// Create a handler context over `store`.
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

/// Register the built-in and secret method handlers.
pub async fn register_all(registry: &MethodRegistry, context: HandlerContext) {
    let ctx = Arc::new(context);

    register_builtin(registry).await;

    registry
        .register(methods::CREATE_SECRET, Arc::new(CreateSecretHandler::new(ctx.clone())))
        .await;
    registry
        .register(methods::GET_SECRET, Arc::new(GetSecretHandler::new(ctx.clone())))
        .await;
    registry
        .register(methods::EDIT_SECRET, Arc::new(EditSecretHandler::new(ctx.clone())))
        .await;
    registry
        .register(methods::DELETE_SECRET, Arc::new(DeleteSecretHandler::new(ctx.clone())))
        .await;
    registry
        .register(
            methods::LIST_SECRETS_BY_TYPE,
            Arc::new(ListSecretsByTypeHandler::new(ctx)),
        )
        .await;
}

/// Deserialize required method parameters.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T> {
    let params = params.ok_or_else(|| ServerError::InvalidParams("Missing parameters".into()))?;
    serde_json::from_value(params).map_err(|e| ServerError::InvalidParams(e.to_string()))
}
