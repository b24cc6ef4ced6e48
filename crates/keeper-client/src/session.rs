//! A logged-in client session.
//!
//! Opening a session fills the cache once and starts the background sync
//! task; closing it stops the task and forgets every cached secret.

use keeper_core::config::ClientConfig;
use keeper_secrets::PayloadCodec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::SecretCache;
use crate::error::{ClientError, Result};
use crate::remote::{RpcRemote, SecretRemote};
use crate::service::SecretService;
use crate::sync::{SyncHandle, SyncReport};

/// Client session with a running periodic sync.
pub struct ClientSession {
    service: SecretService,
    sync_task: Option<SyncHandle>,
}

impl ClientSession {
    /// Open a session against the server named in `config`.
    ///
    /// Like [`open`](Self::open), the report of the initial sync comes back
    /// with the session.
    pub async fn connect(
        config: &ClientConfig,
        codec: Arc<dyn PayloadCodec>,
    ) -> Result<(Self, SyncReport)> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| ClientError::Auth("no token configured; log in first".to_string()))?;
        let remote = RpcRemote::http(&config.server_url, token)?;
        Self::open(
            Arc::new(remote),
            codec,
            Duration::from_secs(config.sync_interval_secs),
        )
        .await
    }

    /// Open a session over any remote.
    ///
    /// Runs one full sync before returning; its report is handed back so the
    /// caller can surface partial failures.
    pub async fn open(
        remote: Arc<dyn SecretRemote>,
        codec: Arc<dyn PayloadCodec>,
        interval: Duration,
    ) -> Result<(Self, SyncReport)> {
        if interval.is_zero() {
            return Err(ClientError::Validation(
                "sync interval must be greater than zero".to_string(),
            ));
        }

        let service = SecretService::new(remote, codec, Arc::new(SecretCache::new()));
        let report = service.sync_engine().sync_all().await;
        if !report.is_clean() {
            warn!(failed = report.failed.len(), "initial sync incomplete");
        }
        let sync_task = service.sync_engine().spawn_periodic(interval);
        info!(
            cached = report.total_synced(),
            interval_secs = interval.as_secs(),
            "session opened"
        );

        Ok((
            Self {
                service,
                sync_task: Some(sync_task),
            },
            report,
        ))
    }

    pub fn service(&self) -> &SecretService {
        &self.service
    }

    /// Stop background sync and clear the cache.
    pub async fn close(mut self) {
        if let Some(task) = self.sync_task.take() {
            task.stop().await;
        }
        self.service.cache().reset().await;
        info!("session closed");
    }
}
