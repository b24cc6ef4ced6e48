//! In-memory secret store.

use async_trait::async_trait;
use keeper_core::types::stamp;
use keeper_core::{OwnerId, SecretId, SecretType};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{NewSecret, SecretEdit, SecretStore, StoreResult, StoredSecret};
use crate::error::StoreError;

/// In-memory secret store. Contents are lost on shutdown.
pub struct MemorySecretStore {
    inner: RwLock<Inner>,
}

struct Inner {
    next_id: i64,
    rows: BTreeMap<SecretId, StoredSecret>,
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl Inner {
    fn owned(&self, id: SecretId, owner: &OwnerId) -> Option<&StoredSecret> {
        self.rows.get(&id).filter(|row| &row.owner == owner)
    }

    fn owned_mut(&mut self, id: SecretId, owner: &OwnerId) -> Option<&mut StoredSecret> {
        self.rows.get_mut(&id).filter(|row| &row.owner == owner)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn create(&self, secret: NewSecret) -> StoreResult<StoredSecret> {
        let mut inner = self.inner.write().await;
        let id = SecretId::new(inner.next_id);
        inner.next_id += 1;

        let now = stamp::now();
        let row = StoredSecret {
            id,
            owner: secret.owner,
            secret_type: secret.secret_type,
            title: secret.title,
            content: secret.content,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        inner.rows.insert(id, row.clone());

        debug!(id = %id, secret_type = %row.secret_type, "secret created");
        Ok(row)
    }

    async fn get(&self, id: SecretId, owner: &OwnerId) -> StoreResult<StoredSecret> {
        let inner = self.inner.read().await;
        inner
            .owned(id, owner)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn edit(&self, edit: SecretEdit, force: bool) -> StoreResult<StoredSecret> {
        // one write guard spans the compare and the update
        let mut inner = self.inner.write().await;
        let row = inner
            .owned_mut(edit.id, &edit.owner)
            .filter(|row| !row.is_deleted)
            .ok_or(StoreError::NotFound(edit.id))?;

        if !force && row.updated_at != edit.known_updated_at {
            return Err(StoreError::VersionConflict {
                id: edit.id,
                current: row.updated_at,
            });
        }

        row.title = edit.title;
        row.secret_type = edit.secret_type;
        row.content = edit.content;
        row.updated_at = stamp::next_after(row.updated_at);

        debug!(id = %edit.id, force, "secret edited");
        Ok(row.clone())
    }

    async fn delete(&self, id: SecretId, owner: &OwnerId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let row = inner
            .owned_mut(id, owner)
            .ok_or(StoreError::NotFound(id))?;
        row.is_deleted = true;

        debug!(id = %id, "secret soft-deleted");
        Ok(())
    }

    async fn list_by_type(
        &self,
        secret_type: SecretType,
        owner: &OwnerId,
    ) -> StoreResult<Vec<StoredSecret>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|row| row.secret_type == secret_type && &row.owner == owner)
            .cloned()
            .collect())
    }
}
