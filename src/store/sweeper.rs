//! Periodic full clear of the shared cache, on top of per-entry TTLs.

use crate::core::cache::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{info, warn};

const MIN_CLEAR_INTERVAL: Duration = Duration::from_secs(1);

/// Spawns a task that clears `cache` every `every`. The first clear happens
/// one full period after the call. Abort the handle to stop it.
pub fn spawn_periodic_clear(cache: Arc<dyn Cache>, every: Duration) -> JoinHandle<()> {
    let every = if every < MIN_CLEAR_INTERVAL {
        warn!(
            "Cache clear interval {:?} too short, using {:?}",
            every, MIN_CLEAR_INTERVAL
        );
        MIN_CLEAR_INTERVAL
    } else {
        every
    };

    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + every;
        let mut ticker = interval_at(start, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            cache.clear().await;
            info!("Cache cleared");
        }
    })
}
