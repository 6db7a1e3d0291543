use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::store::KeyValueStore;
use crate::error::Result;

/// Cache-aside memoization over a [`KeyValueStore`].
///
/// `resolve` checks the store first, invokes the producer on a miss, and
/// writes the produced value back under the caller's TTL. In write-only
/// mode the read is skipped, so every call re-produces and re-writes:
/// the store warms up without ever serving from it.
#[derive(Clone)]
pub struct CachedResolver {
    store: Arc<dyn KeyValueStore>,
    write_only: bool,
}

impl CachedResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, write_only: bool) -> Self {
        Self { store, write_only }
    }

    /// Resolve `key`, calling `produce` on a miss.
    ///
    /// On a hit the producer is never invoked. `Ok(None)` from the producer
    /// is returned as-is and never cached, so an empty upstream answer
    /// cannot shadow a later real one for the whole TTL. Producer errors
    /// propagate untouched and nothing is written.
    ///
    /// Concurrent misses for the same key each produce independently and
    /// race the write; last write wins. Writes are idempotent per key, so
    /// the race is benign.
    pub async fn resolve<T, F, Fut>(&self, key: &str, ttl_seconds: u64, produce: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if !self.write_only {
            if let Some(raw) = self.store.get(key).await? {
                match serde_json::from_str(&raw) {
                    Ok(value) => {
                        debug!("{key}: serving from cache");
                        return Ok(Some(value));
                    }
                    // An undecodable entry reads as a miss; the write below
                    // replaces it.
                    Err(e) => warn!("{key}: discarding undecodable cache entry: {e}"),
                }
            }
        }

        debug!("{key}: resolving");
        let produced = produce().await?;
        if let Some(value) = &produced {
            let raw = serde_json::to_string(value)?;
            self.store.set_with_expiry(key, &raw, ttl_seconds).await?;
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::error::AppError;

    fn resolver(write_only: bool) -> (CachedResolver, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CachedResolver::new(store.clone(), write_only), store)
    }

    #[tokio::test]
    async fn hit_returns_cached_value_without_producing() {
        let (resolver, store) = resolver(false);
        store.set_with_expiry("k", "\"cached\"", 60).await.unwrap();

        let calls = AtomicU32::new(0);
        let value: Option<String> = resolver
            .resolve("k", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some("produced".to_string()))
            })
            .await
            .unwrap();

        assert_eq!(value.as_deref(), Some("cached"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn miss_produces_writes_and_serves_from_cache_after() {
        let (resolver, store) = resolver(false);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value: Option<u32> = resolver
                .resolve("k", 60, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(7))
                })
                .await
                .unwrap();
            assert_eq!(value, Some(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn expired_entry_is_resolved_again() {
        let (resolver, store) = resolver(false);
        store.set_with_expiry("k", "\"stale\"", 0).await.unwrap();

        let value: Option<String> = resolver
            .resolve("k", 60, || async { Ok(Some("fresh".to_string())) })
            .await
            .unwrap();

        assert_eq!(value.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn none_is_never_persisted_and_producer_runs_again() {
        let (resolver, store) = resolver(false);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value: Option<u32> = resolver
                .resolve("k", 60, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert_eq!(value, None);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn producer_error_propagates_and_nothing_is_cached() {
        let (resolver, store) = resolver(false);

        let result: Result<Option<u32>> = resolver
            .resolve("k", 60, || async {
                Err(AppError::Parse("upstream went sideways".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_only_mode_always_produces_and_still_writes() {
        let (resolver, store) = resolver(true);
        store.set_with_expiry("k", "\"cached\"", 60).await.unwrap();

        let calls = AtomicU32::new(0);
        let value: Option<String> = resolver
            .resolve("k", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some("produced".to_string()))
            })
            .await
            .unwrap();

        assert_eq!(value.as_deref(), Some("produced"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("\"produced\""));
    }

    #[tokio::test]
    async fn repeated_resolution_stores_identical_bytes() {
        let (resolver, store) = resolver(true);
        let produce = || async { Ok(Some(serde_json::json!({"a": 1, "b": [2, 3]}))) };

        resolver.resolve("k", 60, produce).await.unwrap();
        let first = store.get("k").await.unwrap().unwrap();
        resolver.resolve("k", 60, produce).await.unwrap();
        let second = store.get("k").await.unwrap().unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn undecodable_entry_is_treated_as_a_miss() {
        let (resolver, store) = resolver(false);
        store.set_with_expiry("k", "not json at all", 60).await.unwrap();

        let value: Option<u32> = resolver.resolve("k", 60, || async { Ok(Some(5)) }).await.unwrap();

        assert_eq!(value, Some(5));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("5"));
    }
}
