pub mod cli;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod settings;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::{
    proxy::{AppContext, cache::ResponseCache, origin::HttpOrigin},
    settings::{Command, Settings},
};

pub async fn run(settings: Settings) -> Result<()> {
    match settings.command() {
        Command::ClearCache => {
            clear_cache(&ResponseCache::new());
            Ok(())
        }
        Command::Serve => serve(settings).await,
    }
}

/// Empties `cache`. The store lives in process memory, so a standalone
/// `--clear-cache` run only ever clears its own freshly created store.
pub fn clear_cache(cache: &ResponseCache) {
    cache.clear();
    metrics::record_cache_clear();
    info!("cache cleared successfully");
}

async fn serve(settings: Settings) -> Result<()> {
    if let Some(addr) = settings.metrics_listen {
        tokio::spawn(async move {
            info!(address = %addr, "metrics endpoint starting");
            if let Err(err) = metrics::serve(addr).await {
                error!(error = %err, "metrics endpoint failed");
            }
        });
    }

    let origin = Arc::new(HttpOrigin::new(settings.origin_timeout())?);
    let app = AppContext::new(Arc::new(settings), ResponseCache::new(), origin);
    proxy::run(app).await
}
