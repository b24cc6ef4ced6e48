//! Per-owner secret storage.
//!
//! Every operation is scoped to an owner. A row that exists but belongs to
//! someone else is reported exactly like a row that does not exist.
//!
//! Deletion is soft: `is_deleted` flips to true and never back, and the row
//! keeps being returned by [`SecretStore::get`] and
//! [`SecretStore::list_by_type`] so callers can tell "deleted" from "never
//! existed".

mod memory;
mod sqlite;

pub use memory::MemorySecretStore;
pub use sqlite::SqliteSecretStore;

use async_trait::async_trait;
use keeper_core::wire::{GetSecretResponse, SecretHeader, SecretListEntry};
use keeper_core::{OwnerId, SecretId, SecretType, VersionStamp};

use crate::error::StoreError;

/// Store result type.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A secret to be created.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub owner: OwnerId,
    pub secret_type: SecretType,
    pub title: String,
    /// Opaque ciphertext.
    pub content: Vec<u8>,
}

/// A replacement for an existing secret.
#[derive(Debug, Clone)]
pub struct SecretEdit {
    pub id: SecretId,
    pub owner: OwnerId,
    pub secret_type: SecretType,
    pub title: String,
    pub content: Vec<u8>,
    /// Stamp the caller last observed. Compared for exact equality.
    pub known_updated_at: VersionStamp,
}

/// A stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub id: SecretId,
    pub owner: OwnerId,
    pub secret_type: SecretType,
    pub title: String,
    pub content: Vec<u8>,
    pub created_at: VersionStamp,
    pub updated_at: VersionStamp,
    pub is_deleted: bool,
}

impl StoredSecret {
    /// Envelope returned by create and edit.
    pub fn header(&self) -> SecretHeader {
        SecretHeader {
            id: self.id,
            title: self.title.clone(),
            secret_type: self.secret_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<StoredSecret> for GetSecretResponse {
    fn from(s: StoredSecret) -> Self {
        Self {
            id: s.id,
            title: s.title,
            secret_type: s.secret_type,
            content: s.content,
            created_at: s.created_at,
            updated_at: s.updated_at,
            is_deleted: s.is_deleted,
        }
    }
}

impl From<StoredSecret> for SecretListEntry {
    fn from(s: StoredSecret) -> Self {
        Self {
            id: s.id,
            owner: s.owner,
            secret_type: s.secret_type,
            title: s.title,
            content: s.content,
            created_at: s.created_at,
            updated_at: s.updated_at,
            is_deleted: s.is_deleted,
        }
    }
}

/// Trait for secret stores.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Insert a new row. Assigns the id and sets both stamps to now.
    async fn create(&self, secret: NewSecret) -> StoreResult<StoredSecret>;

    /// Fetch a row, deleted or not.
    async fn get(&self, id: SecretId, owner: &OwnerId) -> StoreResult<StoredSecret>;

    /// Replace title, type, and content under optimistic concurrency.
    ///
    /// Without `force`, a `known_updated_at` different from the stored stamp
    /// fails with [`StoreError::VersionConflict`] and writes nothing. The
    /// check and the write are atomic per row. On success the stamp moves
    /// strictly forward. Soft-deleted rows cannot be edited.
    async fn edit(&self, edit: SecretEdit, force: bool) -> StoreResult<StoredSecret>;

    /// Set the soft-delete flag.
    async fn delete(&self, id: SecretId, owner: &OwnerId) -> StoreResult<()>;

    /// All rows of one type for an owner, deleted ones included, by id.
    async fn list_by_type(
        &self,
        secret_type: SecretType,
        owner: &OwnerId,
    ) -> StoreResult<Vec<StoredSecret>>;
}
