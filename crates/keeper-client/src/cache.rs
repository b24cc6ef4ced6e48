//! Local read cache of decrypted secrets.
//!
//! One partition per cacheable type, all behind a single reader/writer lock:
//! reads share the lock, every mutation takes it exclusively. A partition
//! is either empty (never synced) or exactly the result of the last sync
//! for its type, so replacing one is a single swap under the write guard.

use keeper_core::{SecretId, SecretType};
use keeper_secrets::CachedSecret;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Outcome of probing the cache by id alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A live record.
    Found(CachedSecret),
    /// A tombstone: the secret existed and was deleted.
    Deleted(SecretType),
    /// No partition knows this id.
    Missing,
}

type Partition = HashMap<SecretId, CachedSecret>;

/// Type-partitioned secret cache.
#[derive(Debug, Default)]
pub struct SecretCache {
    partitions: RwLock<HashMap<SecretType, Partition>>,
}

impl SecretCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `id` in the partition for `secret_type`.
    pub async fn get(&self, secret_type: SecretType, id: SecretId) -> Option<CachedSecret> {
        let partitions = self.partitions.read().await;
        partitions
            .get(&secret_type)
            .and_then(|partition| partition.get(&id))
            .cloned()
    }

    /// Replace the whole partition for `secret_type` with `records`.
    ///
    /// Every record must be of `secret_type`; otherwise nothing changes.
    pub async fn set_all(&self, secret_type: SecretType, records: Vec<CachedSecret>) -> Result<()> {
        if !secret_type.is_cacheable() {
            return Err(ClientError::WrongMethod(format!(
                "{secret_type} secrets are not cached"
            )));
        }
        if let Some(stray) = records.iter().find(|r| r.secret_type() != secret_type) {
            return Err(ClientError::Validation(format!(
                "secret {} is {}, not {secret_type}",
                stray.id(),
                stray.secret_type()
            )));
        }

        let partition: Partition = records.into_iter().map(|r| (r.id(), r)).collect();
        let count = partition.len();

        let mut partitions = self.partitions.write().await;
        partitions.insert(secret_type, partition);

        debug!(%secret_type, count, "cache partition replaced");
        Ok(())
    }

    /// Probe every partition for `id`.
    pub async fn find_any(&self, id: SecretId) -> CacheLookup {
        let partitions = self.partitions.read().await;
        for secret_type in SecretType::CACHEABLE {
            if let Some(record) = partitions.get(&secret_type).and_then(|p| p.get(&id)) {
                return if record.is_deleted() {
                    CacheLookup::Deleted(secret_type)
                } else {
                    CacheLookup::Found(record.clone())
                };
            }
        }
        CacheLookup::Missing
    }

    /// Blank the entry for `id` into a tombstone, wherever it lives.
    ///
    /// Returns whether an entry was found.
    pub async fn delete(&self, id: SecretId) -> bool {
        let mut partitions = self.partitions.write().await;
        for partition in partitions.values_mut() {
            if let Some(record) = partition.remove(&id) {
                partition.insert(id, record.into_tombstone());
                debug!(id = %id, "cache entry tombstoned");
                return true;
            }
        }
        false
    }

    /// Drop every partition.
    pub async fn reset(&self) {
        let mut partitions = self.partitions.write().await;
        partitions.clear();
        debug!("cache reset");
    }

    /// All records of one type, tombstones included, ordered by id.
    pub async fn list(&self, secret_type: SecretType) -> Vec<CachedSecret> {
        let partitions = self.partitions.read().await;
        let mut records: Vec<CachedSecret> = partitions
            .get(&secret_type)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(CachedSecret::id);
        records
    }

    /// Whether the partition for `secret_type` holds anything.
    pub async fn is_populated(&self, secret_type: SecretType) -> bool {
        let partitions = self.partitions.read().await;
        partitions
            .get(&secret_type)
            .is_some_and(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::types::stamp;
    use keeper_secrets::{RecordEnvelope, SecretContent};
    use std::sync::Arc;

    fn text(id: i64, body: &str) -> CachedSecret {
        CachedSecret::from_content(
            RecordEnvelope {
                id: SecretId::new(id),
                title: format!("note {id}"),
                updated_at: stamp::now(),
                is_deleted: false,
            },
            SecretContent::text(body),
        )
        .unwrap()
    }

    fn ids(records: &[CachedSecret]) -> Vec<i64> {
        records.iter().map(|r| r.id().get()).collect()
    }

    #[tokio::test]
    async fn test_set_all_replaces_wholesale() {
        let cache = SecretCache::new();
        cache
            .set_all(SecretType::Text, vec![text(1, "a"), text(2, "b"), text(3, "c")])
            .await
            .unwrap();
        cache
            .set_all(SecretType::Text, vec![text(2, "b2"), text(4, "d")])
            .await
            .unwrap();

        assert_eq!(ids(&cache.list(SecretType::Text).await), vec![2, 4]);
        assert!(cache.get(SecretType::Text, SecretId::new(1)).await.is_none());
        match cache.get(SecretType::Text, SecretId::new(2)).await {
            Some(CachedSecret::Text(t)) => assert_eq!(t.text.expose_secret(), "b2"),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_all_rejects_mixed_kinds() {
        let cache = SecretCache::new();
        cache.set_all(SecretType::Text, vec![text(1, "a")]).await.unwrap();

        let result = cache.set_all(SecretType::Card, vec![text(2, "b")]).await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(!cache.is_populated(SecretType::Card).await);

        let result = cache.set_all(SecretType::Binary, vec![]).await;
        assert!(matches!(result, Err(ClientError::WrongMethod(_))));
    }

    #[tokio::test]
    async fn test_find_any_reports_tombstones() {
        let cache = SecretCache::new();
        cache
            .set_all(SecretType::Text, vec![text(1, "a"), text(2, "b")])
            .await
            .unwrap();

        assert!(matches!(
            cache.find_any(SecretId::new(1)).await,
            CacheLookup::Found(r) if r.id() == SecretId::new(1)
        ));
        assert_eq!(cache.find_any(SecretId::new(9)).await, CacheLookup::Missing);

        assert!(cache.delete(SecretId::new(1)).await);
        assert_eq!(
            cache.find_any(SecretId::new(1)).await,
            CacheLookup::Deleted(SecretType::Text)
        );
        assert!(!cache.delete(SecretId::new(9)).await);

        // tombstones stay listed, blanked
        let listed = cache.list(SecretType::Text).await;
        assert_eq!(ids(&listed), vec![1, 2]);
        assert!(listed[0].is_deleted());
        assert_eq!(listed[0].title(), "");
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let cache = SecretCache::new();
        cache.set_all(SecretType::Text, vec![text(1, "a")]).await.unwrap();
        cache.reset().await;

        assert!(!cache.is_populated(SecretType::Text).await);
        assert_eq!(cache.find_any(SecretId::new(1)).await, CacheLookup::Missing);
    }

    #[tokio::test]
    async fn test_readers_never_see_partial_partition() {
        let cache = Arc::new(SecretCache::new());
        let small: Vec<_> = (1..=3).map(|i| text(i, "x")).collect();
        let large: Vec<_> = (10..=19).map(|i| text(i, "y")).collect();
        cache.set_all(SecretType::Text, small.clone()).await.unwrap();

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for round in 0..50 {
                    let next = if round % 2 == 0 { large.clone() } else { small.clone() };
                    cache.set_all(SecretType::Text, next).await.unwrap();
                }
            })
        };

        for _ in 0..50 {
            let seen = ids(&cache.list(SecretType::Text).await);
            assert!(
                seen == vec![1, 2, 3] || seen == (10..=19).collect::<Vec<_>>(),
                "mixed partition: {seen:?}"
            );
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }
}
