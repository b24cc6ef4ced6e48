//! HTTP server carrying JSON-RPC over `POST /rpc`.

use crate::auth::{StaticTokenResolver, TokenResolver};
use crate::error::ServerError;
use crate::handlers::{register_all, HandlerContext};
use crate::methods::MethodRegistry;
use crate::store::SecretStore;
use crate::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use keeper_core::config::{BindMode, ServerConfig};
use keeper_core::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use keeper_core::AuthContext;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared server state.
pub struct ServerState {
    /// Method registry.
    pub methods: Arc<MethodRegistry>,

    /// Token to identity resolution.
    pub tokens: Arc<dyn TokenResolver>,

    /// Bind mode.
    pub bind: BindMode,

    /// Port number.
    pub port: u16,

    /// Request body limit in bytes.
    pub max_body_bytes: usize,
}

impl ServerState {
    /// Resolve the caller from the `Authorization: Bearer` header.
    fn authenticate(&self, headers: &HeaderMap) -> std::result::Result<AuthContext, ServerError> {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| ServerError::Auth("Missing bearer token".to_string()))?;

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| ServerError::Auth("Malformed authorization header".to_string()))?;

        self.tokens
            .resolve(token)
            .ok_or_else(|| ServerError::Auth("Invalid authentication token".to_string()))
    }
}

/// The secret server.
pub struct SecretServer {
    state: Arc<ServerState>,
}

impl SecretServer {
    /// Create a server over `store`, accepting the tokens listed in `config`.
    pub async fn new(config: &ServerConfig, store: Arc<dyn SecretStore>) -> Self {
        let tokens = StaticTokenResolver::from(&config.tokens);
        if tokens.is_empty() {
            warn!("No tokens configured; every secret request will be rejected");
        }
        Self::with_resolver(config, store, Arc::new(tokens)).await
    }

    /// Create a server with a custom token resolver.
    pub async fn with_resolver(
        config: &ServerConfig,
        store: Arc<dyn SecretStore>,
        tokens: Arc<dyn TokenResolver>,
    ) -> Self {
        let methods = Arc::new(MethodRegistry::new());
        register_all(&methods, HandlerContext::new(store)).await;

        Self {
            state: Arc::new(ServerState {
                methods,
                tokens,
                bind: config.bind,
                port: config.port,
                max_body_bytes: config.max_body_bytes,
            }),
        }
    }

    /// Get the method registry.
    pub fn methods(&self) -> &Arc<MethodRegistry> {
        &self.state.methods
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/rpc", post(rpc_handler))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Get the bind address.
    pub fn bind_address(&self) -> SocketAddr {
        let ip = match self.state.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };

        SocketAddr::from((ip, self.state.port))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_address();
        if self.state.bind != BindMode::Loopback {
            warn!("Server is reachable from the network on {}", addr);
        }

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting secret server on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("Secret server stopped");
        Ok(())
    }
}

/// JSON-RPC endpoint.
async fn rpc_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let auth = match state.authenticate(&headers) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!("Authentication failed: {}", e);
            let response =
                JsonRpcResponse::error(None, JsonRpcError::new(e.code(), e.to_string()));
            return (StatusCode::UNAUTHORIZED, Json(response));
        }
    };

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => {
            let response = JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()));
            return (StatusCode::OK, Json(response));
        }
    };

    debug!("Received RPC request: {} (owner: {})", request.method, auth.owner);
    let response = state.methods.handle(&auth, request).await;
    (StatusCode::OK, Json(response))
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySecretStore;
    use keeper_core::config::ConfigBuilder;

    #[tokio::test]
    async fn test_auth_requires_known_token() {
        let config = ConfigBuilder::new().token("secret", "alice").build();
        let server = SecretServer::new(&config.server, Arc::new(MemorySecretStore::new())).await;
        let state = &server.state;

        // No auth header
        let headers = HeaderMap::new();
        assert!(state.authenticate(&headers).is_err());

        // Wrong token
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer wrong".parse().unwrap());
        assert!(state.authenticate(&headers).is_err());

        // Wrong scheme
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic secret".parse().unwrap());
        assert!(state.authenticate(&headers).is_err());

        // Correct token
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        let auth = state.authenticate(&headers).unwrap();
        assert_eq!(auth.owner.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_bind_address() {
        let config = ConfigBuilder::new().port(9100).bind(BindMode::Lan).build();
        let server = SecretServer::new(&config.server, Arc::new(MemorySecretStore::new())).await;
        assert_eq!(server.bind_address(), SocketAddr::from(([0, 0, 0, 0], 9100)));
    }
}
