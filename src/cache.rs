//! TTL-bounded memoization of assembled catalogs.
//!
//! The store is best-effort: unavailability or corrupt payloads degrade to a
//! fresh computation with a warning, never to a failed request. Keys are
//! namespace-first so equally named applications in different namespaces can
//! never collide.

use crate::k8s::ApplicationRef;
use crate::links::{LinkCatalog, LinkEngine};
use crate::{ApplinksError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Byte-oriented get/set-with-expiry service. Both operations are fallible
/// and treated as best-effort by the caller.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    async fn ping(&self) -> bool;
}

/// Valkey/Redis-protocol store. Every operation carries a bounded timeout so
/// a hung store cannot stall the request path.
pub struct RedisStore {
    client: redis::Client,
    op_timeout: Duration,
}

impl RedisStore {
    pub fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| ApplinksError::Cache(format!("Invalid cache URL: {e}")))?;
        Ok(Self { client, op_timeout })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        timeout(self.op_timeout, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| ApplinksError::Cache("Connection timed out".to_string()))?
            .map_err(|e| ApplinksError::Cache(format!("Connection failed: {e}")))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        timeout(self.op_timeout, conn.get(key))
            .await
            .map_err(|_| ApplinksError::Cache("GET timed out".to_string()))?
            .map_err(|e| ApplinksError::Cache(format!("GET failed: {e}")))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        timeout(self.op_timeout, conn.set_ex::<_, _, ()>(key, value, seconds))
            .await
            .map_err(|_| ApplinksError::Cache("SET timed out".to_string()))?
            .map_err(|e| ApplinksError::Cache(format!("SET failed: {e}")))
    }

    async fn ping(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        timeout(
            self.op_timeout,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
    }
}

/// In-process store used when no cache URL is configured, and by tests.
/// Expired entries are dropped on read.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, (Vec<u8>, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if Instant::now() < *expires_at {
                return Ok(Some(value.clone()));
            }
        }
        self.entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

pub fn cache_key(namespace: &str, app_name: &str) -> String {
    format!("applinks:v1:{namespace}:{app_name}")
}

/// The engine wrapped with keyed, TTL-bounded memoization.
pub struct CachedCatalogService {
    engine: LinkEngine,
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachedCatalogService {
    pub fn new(engine: LinkEngine, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { engine, store, ttl }
    }

    /// Serve from the store when an unexpired entry exists (its original
    /// `generated_at` intact), compute and store otherwise.
    pub async fn get_links(&self, app_ref: &ApplicationRef) -> LinkCatalog {
        let key = cache_key(&app_ref.namespace, &app_ref.app_name);

        match self.store.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<LinkCatalog>(&bytes) {
                Ok(catalog) => {
                    debug!(%key, "Cache hit");
                    return catalog;
                }
                Err(e) => {
                    warn!(%key, error = %e, "Discarding corrupt cache entry");
                }
            },
            Ok(None) => debug!(%key, "Cache miss"),
            Err(e) => warn!(%key, error = %e, "Cache store unavailable, computing fresh"),
        }

        let catalog = self.engine.assemble(app_ref).await;

        match serde_json::to_vec(&catalog) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&key, &bytes, self.ttl).await {
                    warn!(%key, error = %e, "Failed to store catalog in cache");
                }
            }
            Err(e) => warn!(%key, error = %e, "Failed to serialize catalog for cache"),
        }

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_namespace_first() {
        assert_eq!(cache_key("nonprod", "checkout"), "applinks:v1:nonprod:checkout");
        assert_ne!(cache_key("a", "b-c"), cache_key("a-b", "c"));
    }

    #[tokio::test]
    async fn memory_store_round_trips_within_ttl() {
        let store = MemoryStore::new();
        store
            .set("k", b"value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn memory_store_expires_entries() {
        let store = MemoryStore::new();
        store
            .set("k", b"value", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
