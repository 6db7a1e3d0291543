mod api;
mod cache;
mod config;
mod enrich;
mod error;
mod types;
mod watchlist;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::cache::http::CachedHttpClient;
use crate::cache::resolver::CachedResolver;
use crate::cache::store::{KeyValueStore, MemoryStore, SqliteStore};
use crate::config::{Config, HTTP_TIMEOUT_SECS, MEMORY_CACHE_URL};
use crate::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Cache store: one shared handle for the process lifetime ---
    let store: Arc<dyn KeyValueStore> = if cfg.cache_url == MEMORY_CACHE_URL {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::connect(&cfg.cache_url).await?)
    };
    info!("Cache store ready ({})", cfg.cache_backend());
    if cfg.cache_write_only {
        info!("Cache reads disabled (write-only mode)");
    }

    // --- Outbound HTTP through the cache chokepoint ---
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    let resolver = CachedResolver::new(store, cfg.cache_write_only);
    let http = CachedHttpClient::new(client, resolver);

    // --- HTTP/WebSocket server ---
    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    let state = ApiState { http, config: Arc::new(cfg) };
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
