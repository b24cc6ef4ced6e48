//! Secret RPC method handlers.
//!
//! Handlers never look inside `content`; it is stored and returned as the
//! client sent it.

use super::{parse_params, HandlerContext};
use crate::methods::{CallContext, MethodHandler};
use crate::store::{NewSecret, SecretEdit};
use crate::Result;
use async_trait::async_trait;
use keeper_core::wire::{
    CreateSecretRequest, CreateSecretResponse, DeleteSecretRequest, DeleteSecretResponse,
    EditSecretRequest, EditSecretResponse, GetSecretRequest, GetSecretResponse,
    ListSecretsByTypeRequest, ListSecretsByTypeResponse,
};
use std::sync::Arc;
use tracing::{debug, info};

/// `secret.create` handler.
pub struct CreateSecretHandler {
    context: Arc<HandlerContext>,
}

impl CreateSecretHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for CreateSecretHandler {
    async fn call(
        &self,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request: CreateSecretRequest = parse_params(params)?;

        let stored = self
            .context
            .store
            .create(NewSecret {
                owner: ctx.owner.clone(),
                secret_type: request.secret_type,
                title: request.title,
                content: request.content,
            })
            .await?;

        info!(id = %stored.id, owner = %ctx.owner, secret_type = %stored.secret_type, "secret created");
        let response: CreateSecretResponse = stored.header();
        Ok(serde_json::to_value(response)?)
    }
}

/// `secret.get` handler.
///
/// Returns soft-deleted rows with `is_deleted` set.
pub struct GetSecretHandler {
    context: Arc<HandlerContext>,
}

impl GetSecretHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for GetSecretHandler {
    async fn call(
        &self,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request: GetSecretRequest = parse_params(params)?;
        debug!(id = %request.id, "secret get");

        let stored = self.context.store.get(request.id, &ctx.owner).await?;
        Ok(serde_json::to_value(GetSecretResponse::from(stored))?)
    }
}

/// `secret.edit` handler.
pub struct EditSecretHandler {
    context: Arc<HandlerContext>,
}

impl EditSecretHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for EditSecretHandler {
    async fn call(
        &self,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request: EditSecretRequest = parse_params(params)?;
        let force = request.force;

        let stored = self
            .context
            .store
            .edit(
                SecretEdit {
                    id: request.id,
                    owner: ctx.owner.clone(),
                    secret_type: request.secret_type,
                    title: request.title,
                    content: request.content,
                    known_updated_at: request.known_updated_at,
                },
                force,
            )
            .await?;

        info!(id = %stored.id, owner = %ctx.owner, force, "secret edited");
        let response: EditSecretResponse = stored.header();
        Ok(serde_json::to_value(response)?)
    }
}

/// `secret.delete` handler. Soft delete only.
pub struct DeleteSecretHandler {
    context: Arc<HandlerContext>,
}

impl DeleteSecretHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for DeleteSecretHandler {
    async fn call(
        &self,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request: DeleteSecretRequest = parse_params(params)?;

        self.context.store.delete(request.id, &ctx.owner).await?;

        info!(id = %request.id, owner = %ctx.owner, "secret deleted");
        Ok(serde_json::to_value(DeleteSecretResponse::default())?)
    }
}

/// `secret.list_by_type` handler.
pub struct ListSecretsByTypeHandler {
    context: Arc<HandlerContext>,
}

impl ListSecretsByTypeHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for ListSecretsByTypeHandler {
    async fn call(
        &self,
        ctx: &CallContext,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request: ListSecretsByTypeRequest = parse_params(params)?;

        let rows = self
            .context
            .store
            .list_by_type(request.secret_type, &ctx.owner)
            .await?;

        debug!(secret_type = %request.secret_type, count = rows.len(), "secret list");
        let response = ListSecretsByTypeResponse {
            secrets: rows.into_iter().map(Into::into).collect(),
        };
        Ok(serde_json::to_value(response)?)
    }
}
