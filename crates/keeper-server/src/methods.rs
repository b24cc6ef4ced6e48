//! RPC method registry and built-in handlers.

use crate::error::ServerError;
use crate::Result;
use async_trait::async_trait;
use keeper_core::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use keeper_core::wire::methods;
use keeper_core::AuthContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Identity a method call runs under. Handlers scope every store access to
/// `ctx.owner`.
pub type CallContext = AuthContext;

/// Trait for RPC method handlers.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Handle the method call.
    async fn call(
        &self,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value>;
}

/// Registry for RPC methods.
pub struct MethodRegistry {
    /// Registered methods.
    methods: RwLock<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    /// Create an empty method registry.
    pub fn new() -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// Register a method handler.
    pub async fn register(&self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        let mut methods = self.methods.write().await;
        methods.insert(name.into(), handler);
    }

    /// Call a method.
    pub async fn call(
        &self,
        name: &str,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let handler = {
            let methods = self.methods.read().await;
            methods
                .get(name)
                .cloned()
                .ok_or_else(|| ServerError::MethodNotFound(name.to_string()))?
        };

        debug!(method = name, owner = %ctx.owner, "calling method");
        handler.call(ctx, params).await
    }

    /// Dispatch a parsed request and wrap the outcome in a response.
    pub async fn handle(&self, ctx: &CallContext, request: JsonRpcRequest) -> JsonRpcResponse {
        match self.call(&request.method, ctx, request.params).await {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => {
                debug!(method = %request.method, code = e.code(), error = %e, "method failed");
                JsonRpcResponse::error(request.id, JsonRpcError::new(e.code(), e.to_string()))
            }
        }
    }

    /// List registered methods.
    pub async fn list(&self) -> Vec<String> {
        let methods = self.methods.read().await;
        methods.keys().cloned().collect()
    }
}

/// System info method.
pub struct SystemInfoHandler;

#[async_trait]
impl MethodHandler for SystemInfoHandler {
    async fn call(
        &self,
        _ctx: &CallContext,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "name": "keeper-server",
            "version": env!("CARGO_PKG_VERSION"),
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }))
    }
}

/// Ping method.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn call(
        &self,
        ctx: &CallContext,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "pong": true,
            "owner": ctx.owner,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// Register built-in methods.
pub async fn register_builtin(registry: &MethodRegistry) {
    registry
        .register(methods::SYSTEM_INFO, Arc::new(SystemInfoHandler))
        .await;
    registry.register(methods::PING, Arc::new(PingHandler)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::wire::codes;

    #[tokio::test]
    async fn test_method_registry() {
        let registry = MethodRegistry::new();
        register_builtin(&registry).await;

        let ctx = CallContext::new("alice");
        let result = registry.call("ping", &ctx, None).await.unwrap();
        assert_eq!(result["pong"], true);
        assert_eq!(result["owner"], "alice");
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let registry = MethodRegistry::new();

        let ctx = CallContext::new("alice");
        let result = registry.call("nonexistent", &ctx, None).await;
        assert!(matches!(result, Err(ServerError::MethodNotFound(_))));
    }

    #[tokio::test]
    async fn test_handle_wraps_errors() {
        let registry = MethodRegistry::new();
        let ctx = CallContext::new("alice");

        let response = registry
            .handle(&ctx, JsonRpcRequest::new("nope").with_id(7))
            .await;
        assert_eq!(response.id, Some(serde_json::json!(7)));
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }
}
