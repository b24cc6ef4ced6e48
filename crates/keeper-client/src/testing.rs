//! In-memory [`SecretRemote`] for unit tests.

use async_trait::async_trait;
use keeper_core::types::stamp;
use keeper_core::wire::{
    CreateSecretRequest, CreateSecretResponse, EditSecretRequest, EditSecretResponse,
    GetSecretResponse, SecretHeader, SecretListEntry,
};
use keeper_core::{OwnerId, SecretId, SecretType, VersionStamp};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;

use crate::error::{ClientError, Result};
use crate::remote::SecretRemote;

#[derive(Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<SecretId, SecretListEntry>,
    failing: HashSet<SecretType>,
    list_calls: usize,
}

/// Single-owner remote with the same conflict and soft delete rules as the
/// server store.
#[derive(Default)]
pub(crate) struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn stamp_of(&self, id: SecretId) -> Option<VersionStamp> {
        self.state.lock().await.rows.get(&id).map(|r| r.updated_at)
    }

    /// Make listings of `secret_type` fail from now on.
    pub(crate) async fn fail_listing(&self, secret_type: SecretType) {
        self.state.lock().await.failing.insert(secret_type);
    }

    pub(crate) async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }

    /// Simulate another device writing `content` to `id`.
    pub(crate) async fn overwrite(&self, id: SecretId, content: Vec<u8>) {
        let mut state = self.state.lock().await;
        if let Some(row) = state.rows.get_mut(&id) {
            row.content = content;
            row.updated_at = stamp::next_after(row.updated_at);
        }
    }
}

fn header(row: &SecretListEntry) -> SecretHeader {
    SecretHeader {
        id: row.id,
        title: row.title.clone(),
        secret_type: row.secret_type,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[async_trait]
impl SecretRemote for FakeRemote {
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<CreateSecretResponse> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = SecretId::new(state.next_id);
        let now = stamp::now();
        let row = SecretListEntry {
            id,
            owner: OwnerId::new("alice"),
            secret_type: request.secret_type,
            title: request.title,
            content: request.content,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        let response = header(&row);
        state.rows.insert(id, row);
        Ok(response)
    }

    async fn get_secret(&self, id: SecretId) -> Result<GetSecretResponse> {
        let state = self.state.lock().await;
        let row = state
            .rows
            .get(&id)
            .ok_or_else(|| ClientError::NotFound(format!("secret {id}")))?;
        Ok(GetSecretResponse {
            id: row.id,
            title: row.title.clone(),
            secret_type: row.secret_type,
            content: row.content.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.is_deleted,
        })
    }

    async fn edit_secret(&self, request: EditSecretRequest) -> Result<EditSecretResponse> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&request.id)
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ClientError::NotFound(format!("secret {}", request.id)))?;
        if !request.force && request.known_updated_at != row.updated_at {
            return Err(ClientError::VersionConflict(format!("secret {}", request.id)));
        }
        row.title = request.title;
        row.secret_type = request.secret_type;
        row.content = request.content;
        row.updated_at = stamp::next_after(row.updated_at);
        Ok(header(row))
    }

    async fn delete_secret(&self, id: SecretId) -> Result<()> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| ClientError::NotFound(format!("secret {id}")))?;
        row.is_deleted = true;
        Ok(())
    }

    async fn list_secrets_by_type(&self, secret_type: SecretType) -> Result<Vec<SecretListEntry>> {
        let mut state = self.state.lock().await;
        state.list_calls += 1;
        if state.failing.contains(&secret_type) {
            return Err(ClientError::Rpc {
                code: keeper_core::wire::codes::INTERNAL_ERROR,
                message: "listing unavailable".into(),
            });
        }
        Ok(state
            .rows
            .values()
            .filter(|r| r.secret_type == secret_type)
            .cloned()
            .collect())
    }
}
