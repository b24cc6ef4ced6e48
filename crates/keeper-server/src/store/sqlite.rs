//! SQLite-backed secret store.

use async_trait::async_trait;
use keeper_core::types::stamp;
use keeper_core::{OwnerId, SecretId, SecretType};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{FromRow, Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::{NewSecret, SecretEdit, SecretStore, StoreResult, StoredSecret};
use crate::error::StoreError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS secrets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner       TEXT    NOT NULL,
    type_id     INTEGER NOT NULL,
    title       TEXT    NOT NULL,
    content     BLOB    NOT NULL,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    is_deleted  INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_secrets_owner_type ON secrets (owner, type_id);
"#;

const COLUMNS: &str = "id, owner, type_id, title, content, created_at, updated_at, is_deleted";

/// Stamps are stored as microseconds since the epoch so equality survives
/// the round trip exactly.
#[derive(Debug, FromRow)]
struct SecretRow {
    id: i64,
    owner: String,
    type_id: i64,
    title: String,
    content: Vec<u8>,
    created_at: i64,
    updated_at: i64,
    is_deleted: bool,
}

impl TryFrom<SecretRow> for StoredSecret {
    type Error = StoreError;

    fn try_from(row: SecretRow) -> Result<Self, Self::Error> {
        let secret_type = u8::try_from(row.type_id)
            .ok()
            .and_then(|code| SecretType::try_from(code).ok())
            .ok_or_else(|| StoreError::Corrupt(format!("secret {}: type {}", row.id, row.type_id)))?;
        let created_at = stamp::from_micros(row.created_at)
            .ok_or_else(|| StoreError::Corrupt(format!("secret {}: created_at", row.id)))?;
        let updated_at = stamp::from_micros(row.updated_at)
            .ok_or_else(|| StoreError::Corrupt(format!("secret {}: updated_at", row.id)))?;

        Ok(Self {
            id: SecretId::new(row.id),
            owner: OwnerId::new(row.owner),
            secret_type,
            title: row.title,
            content: row.content,
            created_at,
            updated_at,
            is_deleted: row.is_deleted,
        })
    }
}

/// SQLite secret store.
pub struct SqliteSecretStore {
    pool: Pool<Sqlite>,
}

impl SqliteSecretStore {
    /// Open (creating if missing) the database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let store = Self::connect(opts).await?;
        info!(path = %path.display(), "opened secret database");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(opts).await
    }

    async fn connect(opts: SqliteConnectOptions) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            // a single writer connection; also keeps an in-memory database alive
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
    async fn create(&self, secret: NewSecret) -> StoreResult<StoredSecret> {
        let now = stamp::to_micros(stamp::now());
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "INSERT INTO secrets (owner, type_id, title, content, created_at, updated_at, is_deleted) \
             VALUES (?, ?, ?, ?, ?, ?, 0) RETURNING {COLUMNS}"
        ))
        .bind(secret.owner.as_str())
        .bind(i64::from(secret.secret_type.code()))
        .bind(&secret.title)
        .bind(&secret.content)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = row.id, type_id = row.type_id, "secret created");
        row.try_into()
    }

    async fn get(&self, id: SecretId, owner: &OwnerId) -> StoreResult<StoredSecret> {
        sqlx::query_as::<_, SecretRow>(&format!(
            "SELECT {COLUMNS} FROM secrets WHERE id = ? AND owner = ?"
        ))
        .bind(id.get())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?
        .try_into()
    }

    async fn edit(&self, edit: SecretEdit, force: bool) -> StoreResult<StoredSecret> {
        // Compare-and-set in one statement: the row only changes if its stamp
        // still matches, and the new stamp is strictly greater than the old.
        let now = stamp::to_micros(stamp::now());
        // Stored stamps carry whole microseconds; a finer one can never match.
        let known_exact = edit.known_updated_at.timestamp_subsec_nanos() % 1_000 == 0;
        let updated = sqlx::query_as::<_, SecretRow>(&format!(
            "UPDATE secrets \
             SET title = ?, type_id = ?, content = ?, updated_at = MAX(?, updated_at + 1) \
             WHERE id = ? AND owner = ? AND is_deleted = 0 AND (? OR (? AND updated_at = ?)) \
             RETURNING {COLUMNS}"
        ))
        .bind(&edit.title)
        .bind(i64::from(edit.secret_type.code()))
        .bind(&edit.content)
        .bind(now)
        .bind(edit.id.get())
        .bind(edit.owner.as_str())
        .bind(force)
        .bind(known_exact)
        .bind(stamp::to_micros(edit.known_updated_at))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            debug!(id = row.id, force, "secret edited");
            return row.try_into();
        }

        // Nothing matched: either the row is gone for this owner or the
        // stamp moved on.
        let current = self.get(edit.id, &edit.owner).await?;
        if current.is_deleted {
            return Err(StoreError::NotFound(edit.id));
        }
        Err(StoreError::VersionConflict {
            id: edit.id,
            current: current.updated_at,
        })
    }

    async fn delete(&self, id: SecretId, owner: &OwnerId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE secrets SET is_deleted = 1 WHERE id = ? AND owner = ?")
            .bind(id.get())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(id = %id, "secret soft-deleted");
        Ok(())
    }

    async fn list_by_type(
        &self,
        secret_type: SecretType,
        owner: &OwnerId,
    ) -> StoreResult<Vec<StoredSecret>> {
        let rows = sqlx::query_as::<_, SecretRow>(&format!(
            "SELECT {COLUMNS} FROM secrets WHERE owner = ? AND type_id = ? ORDER BY id"
        ))
        .bind(owner.as_str())
        .bind(i64::from(secret_type.code()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredSecret::try_from).collect()
    }
}
