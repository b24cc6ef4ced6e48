//! Access to the remote secret store.
//!
//! [`SecretRemote`] is the seam the rest of the client talks to. The shipped
//! implementation, [`RpcRemote`], frames each call as a JSON-RPC request and
//! hands it to an [`RpcTransport`]: HTTP in production, anything that can
//! answer a [`JsonRpcRequest`] in tests.

use async_trait::async_trait;
use keeper_core::rpc::{JsonRpcRequest, JsonRpcResponse};
use keeper_core::wire::{
    methods, CreateSecretRequest, CreateSecretResponse, DeleteSecretRequest,
    DeleteSecretResponse, EditSecretRequest, EditSecretResponse, GetSecretRequest,
    GetSecretResponse, ListSecretsByTypeRequest, ListSecretsByTypeResponse, SecretListEntry,
};
use keeper_core::{SecretId, SecretString, SecretType};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

/// Remote secret operations, scoped by the server to the caller's identity.
///
/// Every call is a single blocking round trip with no retry.
#[async_trait]
pub trait SecretRemote: Send + Sync {
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<CreateSecretResponse>;

    async fn get_secret(&self, id: SecretId) -> Result<GetSecretResponse>;

    async fn edit_secret(&self, request: EditSecretRequest) -> Result<EditSecretResponse>;

    async fn delete_secret(&self, id: SecretId) -> Result<()>;

    /// Every secret of one type, soft-deleted ones included.
    async fn list_secrets_by_type(&self, secret_type: SecretType) -> Result<Vec<SecretListEntry>>;
}

/// Delivers one JSON-RPC request and returns its response.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;
}

/// JSON-RPC implementation of [`SecretRemote`].
#[derive(Clone)]
pub struct RpcRemote {
    transport: Arc<dyn RpcTransport>,
}

impl RpcRemote {
    /// Create a remote over any transport.
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Create a remote talking HTTP to `server_url`.
    pub fn http(server_url: &str, token: SecretString) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(server_url, token)?)))
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::new(method).with_params(serde_json::to_value(params)?);
        debug!(method, "remote call");
        let response = self.transport.send(request).await?;
        response.into_result::<R>().map_err(ClientError::from)
    }
}

#[async_trait]
impl SecretRemote for RpcRemote {
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<CreateSecretResponse> {
        self.call(methods::CREATE_SECRET, &request).await
    }

    async fn get_secret(&self, id: SecretId) -> Result<GetSecretResponse> {
        self.call(methods::GET_SECRET, &GetSecretRequest { id }).await
    }

    async fn edit_secret(&self, request: EditSecretRequest) -> Result<EditSecretResponse> {
        self.call(methods::EDIT_SECRET, &request).await
    }

    async fn delete_secret(&self, id: SecretId) -> Result<()> {
        let _: DeleteSecretResponse = self
            .call(methods::DELETE_SECRET, &DeleteSecretRequest { id })
            .await?;
        Ok(())
    }

    async fn list_secrets_by_type(&self, secret_type: SecretType) -> Result<Vec<SecretListEntry>> {
        let response: ListSecretsByTypeResponse = self
            .call(
                methods::LIST_SECRETS_BY_TYPE,
                &ListSecretsByTypeRequest { secret_type },
            )
            .await?;
        Ok(response.secrets)
    }
}

/// HTTP transport posting to `<server_url>/rpc` with a bearer token.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    token: SecretString,
}

impl HttpTransport {
    /// Create a transport for `server_url`.
    pub fn new(server_url: &str, token: SecretString) -> Result<Self> {
        if token.is_blank() {
            return Err(ClientError::Validation("bearer token is empty".to_string()));
        }

        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("rpc")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.token.expose_secret())
            .json(&request)
            .send()
            .await?;

        // Error statuses still carry a JSON-RPC body; fall back to the status
        // when they don't.
        let status = response.status();
        match response.json::<JsonRpcResponse>().await {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => Err(ClientError::Rpc {
                code: i32::from(status.as_u16()),
                message: format!("HTTP {status}"),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
