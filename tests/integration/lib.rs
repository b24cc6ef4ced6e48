//! Shared harness for SecretKeeper integration tests.
//!
//! Wires a client [`SecretService`] straight to a server [`MethodRegistry`]
//! so scenarios run without sockets. The HTTP path is covered separately.

use async_trait::async_trait;
use keeper_client::{RpcRemote, RpcTransport, SecretCache, SecretService};
use keeper_core::rpc::{JsonRpcRequest, JsonRpcResponse};
use keeper_core::AuthContext;
use keeper_secrets::{AesGcmCodec, PayloadCodec};
use keeper_server::handlers::{register_all, HandlerContext};
use keeper_server::{MemorySecretStore, MethodRegistry, SecretStore};
use std::sync::Arc;

/// Delivers requests to a registry as a fixed, already authenticated caller.
pub struct InProcessTransport {
    registry: Arc<MethodRegistry>,
    caller: AuthContext,
}

impl InProcessTransport {
    pub fn new(registry: Arc<MethodRegistry>, owner: &str) -> Self {
        Self {
            registry,
            caller: AuthContext::new(owner),
        }
    }
}

#[async_trait]
impl RpcTransport for InProcessTransport {
    async fn send(&self, request: JsonRpcRequest) -> keeper_client::Result<JsonRpcResponse> {
        // Round-trip through JSON so the wire encoding is exercised.
        let request: JsonRpcRequest = serde_json::from_value(serde_json::to_value(request)?)?;
        let response = self.registry.handle(&self.caller, request).await;
        Ok(serde_json::from_value(serde_json::to_value(response)?)?)
    }
}

/// Registry with every method registered over `store`.
pub async fn registry_over(store: Arc<dyn SecretStore>) -> Arc<MethodRegistry> {
    let registry = Arc::new(MethodRegistry::new());
    register_all(&registry, HandlerContext::new(store)).await;
    registry
}

/// Registry over a fresh in-memory store.
pub async fn memory_registry() -> Arc<MethodRegistry> {
    registry_over(Arc::new(MemorySecretStore::new())).await
}

/// Codec over a fixed test key; devices of one user share it.
pub fn codec(seed: u8) -> Arc<dyn PayloadCodec> {
    match AesGcmCodec::new(vec![seed; 32]) {
        Ok(codec) => Arc::new(codec),
        Err(e) => panic!("test key rejected: {e}"),
    }
}

/// A client device for `owner`, with its own empty cache.
pub fn device(
    registry: &Arc<MethodRegistry>,
    owner: &str,
    codec: Arc<dyn PayloadCodec>,
) -> SecretService {
    let transport = InProcessTransport::new(registry.clone(), owner);
    let remote = RpcRemote::new(Arc::new(transport));
    SecretService::new(Arc::new(remote), codec, Arc::new(SecretCache::new()))
}
