//! Cache abstraction shared by every provider and the rate converter

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

/// A process-wide key/value store with time-boxed entries.
///
/// Values are opaque bytes; use [`get_json`] and [`put_json`] for typed access.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn put(&self, key: &str, value: Vec<u8>);
    async fn clear(&self);
}

/// Reads `key` and decodes it as `T`. An undecodable entry reads as absent.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let bytes = cache.get(key).await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%key, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}

pub async fn put_json<T: Serialize + ?Sized>(cache: &dyn Cache, key: &str, value: &T) {
    match serde_json::to_vec(value) {
        Ok(bytes) => cache.put(key, bytes).await,
        Err(e) => warn!(%key, error = %e, "Failed to encode cache entry"),
    }
}
