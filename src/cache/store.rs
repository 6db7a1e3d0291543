use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

/// String-keyed store with per-entry expiry, the cache layer's only view
/// of the outside world. Resolvers never talk to a backend directly, so
/// tests swap in [`MemoryStore`] without touching resolver code.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the live value for `key`; expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, expiring `ttl_seconds` from now.
    /// Overwrites any previous entry for the key.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// Durable backend. One pool opened at startup and shared by every request
/// for the process lifetime.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let store = Self { pool };
        store.sweep_expired().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Drops entries already past their expiry. Reads filter on expiry
    /// anyway; this just keeps the file from accumulating dead rows.
    async fn sweep_expired(&self) -> Result<()> {
        let now = now_secs() as i64;
        let swept = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        if swept.rows_affected() > 0 {
            debug!("swept {} expired cache entries", swept.rows_affected());
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = now_secs() as i64;
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let expires_at = (now_secs() + ttl_seconds) as i64;
        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process backend, selected with `CACHE_URL=memory`. Entries die with
/// the process. Doubles as the fake store in unit tests.
#[derive(Default)]
pub struct MemoryStore {
    /// key → (value, expires_at unix seconds)
    entries: DashMap<String, (String, u64)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let live = self.entries.get(key).and_then(|entry| {
            let (value, expires_at) = entry.value();
            (*expires_at > now_secs()).then(|| value.clone())
        });
        if live.is_none() {
            // Guard released above; safe to take the shard lock again.
            self.entries
                .remove_if(key, |_, (_, expires_at)| *expires_at <= now_secs());
        }
        Ok(live)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            (value.to_string(), now_secs() + ttl_seconds),
        );
        Ok(())
    }
}
