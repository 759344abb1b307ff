use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

struct CacheEntry {
    value: Vec<u8>,
    created_at: Instant,
}

/// In-memory cache with a single TTL applied to every entry.
///
/// Expiry is checked lazily on read; an expired entry is evicted and reported
/// as absent. There is no size bound, growth is capped by [`Cache::clear`].
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, expired ones included until they are read.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut cache = self.inner.lock().await;
        let entry = match cache.get(key) {
            Some(entry) => entry,
            None => {
                debug!("Cache MISS for key: {}", key);
                return None;
            }
        };

        if entry.created_at.elapsed() > self.ttl {
            debug!("Cache entry expired for key: {}", key);
            cache.remove(key);
            return None;
        }

        debug!("Cache HIT for key: {}", key);
        Some(entry.value.clone())
    }

    async fn put(&self, key: &str, value: Vec<u8>) {
        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
        };

        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {}", key);
        cache.insert(key.to_string(), entry);
    }

    async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }
}
