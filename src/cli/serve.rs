use crate::App;
use crate::core::Cache;
use crate::server::ToolServer;
use crate::store::spawn_periodic_clear;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, warn};

/// Runs the tool server on stdin/stdout until stdin closes.
pub async fn run(app: &App) -> Result<()> {
    let shared: Arc<dyn Cache> = app.cache.clone();
    let sweeper = spawn_periodic_clear(shared, app.config.cache.clear_interval());

    // Warm the symbol catalogs so the first calls hit the cache
    let resolver = Arc::clone(&app.resolver);
    tokio::spawn(async move {
        let assets = resolver.list_assets().await;
        if assets.is_empty() {
            warn!("Failed to preheat asset cache");
        } else {
            debug!("Preheated cache with {} assets", assets.len());
        }
    });

    let server = ToolServer::new(Arc::clone(&app.resolver));
    let result = server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;

    sweeper.abort();
    result
}
