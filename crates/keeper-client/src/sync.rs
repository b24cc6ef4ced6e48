//! Full-refresh synchronization of the local cache.
//!
//! Each pass lists every secret of a type from the remote, decrypts and
//! parses each payload, and replaces the cache partition with the result.
//! There is no incremental mode.

use keeper_core::wire::SecretListEntry;
use keeper_core::{SecretId, SecretType};
use keeper_secrets::{CachedSecret, PayloadCodec, RecordEnvelope, SecretContent};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::SecretCache;
use crate::error::{ClientError, Result};
use crate::remote::SecretRemote;

/// An item skipped during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub id: SecretId,
    pub reason: String,
}

/// Result of syncing a single type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSync {
    /// Records now in the partition, tombstones included.
    pub synced: usize,
    /// Items that could not be decoded and were left out.
    pub skipped: Vec<SkippedItem>,
}

/// Result of a [`SyncEngine::sync_all`] pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Types whose partition was replaced.
    pub synced: BTreeMap<SecretType, TypeSync>,
    /// Types whose listing failed; their partitions were left untouched.
    pub failed: BTreeMap<SecretType, String>,
}

impl SyncReport {
    /// Whether every type synced and every item decoded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.synced.values().all(|t| t.skipped.is_empty())
    }

    /// Records synced across all types.
    pub fn total_synced(&self) -> usize {
        self.synced.values().map(|t| t.synced).sum()
    }
}

/// Pulls secrets from the remote into the cache.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn SecretRemote>,
    codec: Arc<dyn PayloadCodec>,
    cache: Arc<SecretCache>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn SecretRemote>,
        codec: Arc<dyn PayloadCodec>,
        cache: Arc<SecretCache>,
    ) -> Self {
        Self {
            remote,
            codec,
            cache,
        }
    }

    /// The cache this engine fills.
    pub fn cache(&self) -> &Arc<SecretCache> {
        &self.cache
    }

    /// Refresh the partition for one cacheable type.
    ///
    /// Undecodable items are skipped and reported; the partition is replaced
    /// with the rest. If the listing itself fails the partition is untouched.
    pub async fn sync_type(&self, secret_type: SecretType) -> Result<TypeSync> {
        if !secret_type.is_cacheable() {
            return Err(ClientError::WrongMethod(format!(
                "{secret_type} secrets are not synced"
            )));
        }

        let entries = self.remote.list_secrets_by_type(secret_type).await?;
        debug!(%secret_type, count = entries.len(), "listing received");

        let mut records = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();
        for entry in entries {
            let id = entry.id;
            match self.decode_entry(secret_type, entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%secret_type, id = %id, error = %e, "skipping undecodable secret");
                    skipped.push(SkippedItem {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let synced = records.len();
        self.cache.set_all(secret_type, records).await?;
        Ok(TypeSync { synced, skipped })
    }

    /// Refresh every cacheable type.
    ///
    /// A failure on one type is recorded and the remaining types still run.
    pub async fn sync_all(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for secret_type in SecretType::CACHEABLE {
            match self.sync_type(secret_type).await {
                Ok(result) => {
                    report.synced.insert(secret_type, result);
                }
                Err(e) => {
                    warn!(%secret_type, error = %e, "sync failed");
                    report.failed.insert(secret_type, e.to_string());
                }
            }
        }
        debug!(
            synced = report.total_synced(),
            failed = report.failed.len(),
            "sync pass finished"
        );
        report
    }

    /// Run [`sync_all`](Self::sync_all) every `interval` until stopped.
    ///
    /// The first pass runs one full interval after the call.
    pub fn spawn_periodic(&self, interval: Duration) -> SyncHandle {
        let engine = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "periodic sync started");
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("periodic sync stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = engine.sync_all().await;
                        if !report.is_clean() {
                            warn!(failed = report.failed.len(), "periodic sync incomplete");
                        }
                    }
                }
            }
        });

        SyncHandle { cancel, task }
    }

    fn decode_entry(&self, secret_type: SecretType, entry: SecretListEntry) -> Result<CachedSecret> {
        let envelope = RecordEnvelope {
            id: entry.id,
            title: entry.title,
            updated_at: entry.updated_at,
            is_deleted: entry.is_deleted,
        };

        if entry.secret_type != secret_type {
            return Err(ClientError::Decode(format!(
                "listed as {secret_type} but stored as {}",
                entry.secret_type
            )));
        }

        // Deleted rows keep their ciphertext on the server; the cache only
        // needs to know they are gone.
        if envelope.is_deleted {
            return CachedSecret::tombstone(secret_type, envelope.id, envelope.updated_at)
                .ok_or_else(|| ClientError::WrongMethod(format!("{secret_type} is not cacheable")));
        }

        let plaintext = self.codec.decode(&entry.content).map_err(ClientError::decode)?;
        let content =
            SecretContent::from_plaintext(secret_type, &plaintext).map_err(ClientError::decode)?;
        CachedSecret::from_content(envelope, content).map_err(ClientError::decode)
    }
}

/// Handle to a running periodic sync task.
pub struct SyncHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop the task and wait for it to exit.
    ///
    /// A pass already in flight is allowed to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "periodic sync task ended abnormally");
        }
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
