//! Client-side secret operations.
//!
//! [`SecretService`] encrypts content before it leaves the process and
//! decrypts what comes back. Writes go straight to the remote and are
//! followed by a full resync; reads differ by operation:
//!
//! - [`get`](SecretService::get) always asks the remote.
//! - [`list`](SecretService::list) answers from the cache whenever the
//!   partition holds anything, and only asks the remote when it is empty.
//!   A populated partition is not refreshed by changes made on other devices
//!   until the next sync pass, so a listing can be stale by up to one sync
//!   interval.

use keeper_core::wire::{CreateSecretRequest, EditSecretRequest, GetSecretResponse, SecretListEntry};
use keeper_core::{SecretId, SecretType, VersionStamp};
use keeper_secrets::{CachedSecret, PayloadCodec, RecordEnvelope, SecretContent};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::SecretCache;
use crate::error::{ClientError, Result};
use crate::remote::SecretRemote;
use crate::sync::SyncEngine;

/// Orchestrates encryption, remote calls, and cache upkeep.
#[derive(Clone)]
pub struct SecretService {
    remote: Arc<dyn SecretRemote>,
    codec: Arc<dyn PayloadCodec>,
    cache: Arc<SecretCache>,
    sync: SyncEngine,
}

impl SecretService {
    pub fn new(
        remote: Arc<dyn SecretRemote>,
        codec: Arc<dyn PayloadCodec>,
        cache: Arc<SecretCache>,
    ) -> Self {
        let sync = SyncEngine::new(remote.clone(), codec.clone(), cache.clone());
        Self {
            remote,
            codec,
            cache,
            sync,
        }
    }

    /// The engine used for resyncs after writes.
    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn cache(&self) -> &Arc<SecretCache> {
        &self.cache
    }

    /// Store a new structured secret and return its server-assigned id.
    pub async fn create(&self, title: &str, content: SecretContent) -> Result<SecretId> {
        reject_binary(&content, "create_binary")?;
        validate(title, &content)?;
        let id = self.create_content(title, &content).await?;
        self.sync.sync_all().await;
        Ok(id)
    }

    /// Store the contents of the file at `path` as a binary secret.
    pub async fn create_binary(&self, title: &str, path: &Path) -> Result<SecretId> {
        require_title(title)?;
        let bytes = tokio::fs::read(path).await?;
        let id = self
            .create_content(title, &SecretContent::Binary(bytes))
            .await?;
        info!(id = %id, path = %path.display(), "binary secret stored");
        Ok(id)
    }

    /// Fetch and decrypt a structured secret from the remote.
    ///
    /// Deleted secrets report `NotFound`. Binary secrets must go through
    /// [`get_binary`](Self::get_binary).
    pub async fn get(&self, id: SecretId) -> Result<CachedSecret> {
        let secret = self.fetch_live(id).await?;
        if secret.secret_type == SecretType::Binary {
            return Err(ClientError::WrongMethod(format!(
                "secret {id} is binary; use get_binary"
            )));
        }

        let (envelope, secret_type, ciphertext) = split(secret);
        let content = self.open(secret_type, &ciphertext)?;
        CachedSecret::from_content(envelope, content).map_err(ClientError::decode)
    }

    /// Fetch a binary secret and write its decrypted bytes to `path`.
    ///
    /// The type is checked before the file is touched.
    pub async fn get_binary(&self, id: SecretId, path: &Path) -> Result<()> {
        let secret = self.fetch_live(id).await?;
        if secret.secret_type != SecretType::Binary {
            return Err(ClientError::WrongMethod(format!(
                "secret {id} is {}; use get",
                secret.secret_type
            )));
        }

        let bytes = self
            .codec
            .decode(&secret.content)
            .map_err(ClientError::decode)?;
        tokio::fs::write(path, &bytes).await?;
        info!(id = %id, path = %path.display(), bytes = bytes.len(), "binary secret written");
        Ok(())
    }

    /// Records of one structured type, cache first.
    ///
    /// Tombstones are included with `is_deleted` set. When the cache has
    /// nothing for the type the remote listing is decrypted instead;
    /// undecodable entries are left out.
    pub async fn list(&self, secret_type: SecretType) -> Result<Vec<CachedSecret>> {
        if !secret_type.is_cacheable() {
            return Err(ClientError::WrongMethod(format!(
                "{secret_type} secrets are listed with list_binary"
            )));
        }

        if self.cache.is_populated(secret_type).await {
            debug!(%secret_type, "list served from cache");
            return Ok(self.cache.list(secret_type).await);
        }

        debug!(%secret_type, "cache empty, listing remote");
        let entries = self.remote.list_secrets_by_type(secret_type).await?;
        let records = entries
            .into_iter()
            .filter_map(|entry| self.decode_listed(secret_type, entry))
            .collect();
        Ok(records)
    }

    /// Envelopes of every binary secret. Always remote.
    pub async fn list_binary(&self) -> Result<Vec<RecordEnvelope>> {
        let entries = self
            .remote
            .list_secrets_by_type(SecretType::Binary)
            .await?;
        Ok(entries
            .into_iter()
            .map(|e| RecordEnvelope {
                id: e.id,
                title: e.title,
                updated_at: e.updated_at,
                is_deleted: e.is_deleted,
            })
            .collect())
    }

    /// Soft-delete a secret, then tombstone its cache entry.
    ///
    /// The cache is only touched once the remote has accepted the delete.
    pub async fn delete(&self, id: SecretId) -> Result<()> {
        self.remote.delete_secret(id).await?;
        if !self.cache.delete(id).await {
            debug!(id = %id, "deleted secret was not cached");
        }
        info!(id = %id, "secret deleted");
        Ok(())
    }

    /// Replace a structured secret, using its current stamp from the remote.
    ///
    /// On success the cache is resynced. On a version conflict the cache is
    /// resynced and the conflict returned; it is never retried.
    pub async fn edit(
        &self,
        id: SecretId,
        title: &str,
        content: SecretContent,
        force: bool,
    ) -> Result<()> {
        reject_binary(&content, "edit_binary")?;
        validate(title, &content)?;
        let current = self.fetch_live(id).await?;
        if current.secret_type == SecretType::Binary {
            return Err(ClientError::WrongMethod(format!(
                "secret {id} is binary; use edit_binary"
            )));
        }
        self.submit_edit(id, title, &content, current.updated_at, force)
            .await
    }

    /// Replace a structured secret against a stamp the caller already holds.
    ///
    /// This is how a device that has been working from its own copy submits
    /// a change: if anyone else wrote since `known_updated_at`, the edit
    /// fails with `VersionConflict` unless `force` is set.
    pub async fn edit_known(
        &self,
        id: SecretId,
        title: &str,
        content: SecretContent,
        known_updated_at: VersionStamp,
        force: bool,
    ) -> Result<()> {
        reject_binary(&content, "edit_binary")?;
        validate(title, &content)?;
        let current = self.fetch_live(id).await?;
        if current.secret_type == SecretType::Binary {
            return Err(ClientError::WrongMethod(format!(
                "secret {id} is binary; use edit_binary"
            )));
        }
        self.submit_edit(id, title, &content, known_updated_at, force)
            .await
    }

    /// Replace a binary secret with the contents of the file at `path`.
    pub async fn edit_binary(
        &self,
        id: SecretId,
        title: &str,
        path: &Path,
        force: bool,
    ) -> Result<()> {
        require_title(title)?;
        let current = self.fetch_live(id).await?;
        if current.secret_type != SecretType::Binary {
            return Err(ClientError::WrongMethod(format!(
                "secret {id} is {}; use edit",
                current.secret_type
            )));
        }
        let bytes = tokio::fs::read(path).await?;
        self.submit_edit(
            id,
            title,
            &SecretContent::Binary(bytes),
            current.updated_at,
            force,
        )
        .await
    }

    async fn create_content(&self, title: &str, content: &SecretContent) -> Result<SecretId> {
        let secret_type = content.secret_type();
        let request = CreateSecretRequest {
            title: title.to_string(),
            secret_type,
            content: self.seal(content)?,
        };
        let created = self.remote.create_secret(request).await?;
        info!(id = %created.id, %secret_type, "secret created");
        Ok(created.id)
    }

    async fn submit_edit(
        &self,
        id: SecretId,
        title: &str,
        content: &SecretContent,
        known_updated_at: VersionStamp,
        force: bool,
    ) -> Result<()> {
        let request = EditSecretRequest {
            id,
            title: title.to_string(),
            secret_type: content.secret_type(),
            content: self.seal(content)?,
            known_updated_at,
            force,
        };

        match self.remote.edit_secret(request).await {
            Ok(updated) => {
                info!(id = %id, updated_at = %updated.updated_at, force, "secret edited");
                self.sync.sync_all().await;
                Ok(())
            }
            Err(err @ ClientError::VersionConflict(_)) => {
                warn!(id = %id, "edit rejected as stale; resyncing");
                self.sync.sync_all().await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Remote read that treats soft-deleted secrets as absent.
    async fn fetch_live(&self, id: SecretId) -> Result<GetSecretResponse> {
        let secret = self.remote.get_secret(id).await?;
        if secret.is_deleted {
            return Err(ClientError::NotFound(format!("secret {id} was deleted")));
        }
        Ok(secret)
    }

    fn decode_listed(&self, secret_type: SecretType, entry: SecretListEntry) -> Option<CachedSecret> {
        if entry.is_deleted {
            return CachedSecret::tombstone(secret_type, entry.id, entry.updated_at);
        }
        let id = entry.id;
        let envelope = RecordEnvelope {
            id,
            title: entry.title,
            updated_at: entry.updated_at,
            is_deleted: false,
        };
        let decoded = self.open(secret_type, &entry.content).and_then(|content| {
            CachedSecret::from_content(envelope, content).map_err(ClientError::decode)
        });
        match decoded {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(%secret_type, %id, error = %e, "skipping undecodable secret");
                None
            }
        }
    }

    fn seal(&self, content: &SecretContent) -> Result<Vec<u8>> {
        let plaintext = content.to_plaintext()?;
        Ok(self.codec.encode(&plaintext)?)
    }

    fn open(&self, secret_type: SecretType, ciphertext: &[u8]) -> Result<SecretContent> {
        let plaintext = self.codec.decode(ciphertext).map_err(ClientError::decode)?;
        SecretContent::from_plaintext(secret_type, &plaintext).map_err(ClientError::decode)
    }
}

fn split(secret: GetSecretResponse) -> (RecordEnvelope, SecretType, Vec<u8>) {
    let envelope = RecordEnvelope {
        id: secret.id,
        title: secret.title,
        updated_at: secret.updated_at,
        is_deleted: secret.is_deleted,
    };
    (envelope, secret.secret_type, secret.content)
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ClientError::Validation("title is missing".to_string()));
    }
    Ok(())
}

fn validate(title: &str, content: &SecretContent) -> Result<()> {
    require_title(title)?;
    content
        .validate()
        .map_err(|e| ClientError::Validation(e.to_string()))
}

fn reject_binary(content: &SecretContent, instead: &str) -> Result<()> {
    if content.secret_type() == SecretType::Binary {
        return Err(ClientError::WrongMethod(format!(
            "binary content goes through {instead}"
        )));
    }
    Ok(())
}
