//! IOC Enricher Server
//!
//! HTTP front for the enrichment engine. Searches are accepted as
//! background jobs and polled by id.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    IOC ENRICHER                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌────────────────────┐  │
//! │  │  API      │──▶│  Job      │──▶│  Enricher          │  │
//! │  │  (Axum)   │   │  Store    │   │  (fan-out, cache)  │  │
//! │  └───────────┘   └───────────┘   └─────────┬──────────┘  │
//! │                                            ▼             │
//! │                              ┌──────────────────────┐    │
//! │                              │ Threat intel APIs    │    │
//! │                              └──────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod jobs;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use enricher_core::{Enricher, MemoryCache, ResultCache};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enricher_server=debug,enricher_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();
    tracing::info!("IOC Enricher starting ({})...", config.environment);

    let enricher = Enricher::builder()
        .cache(result_cache(&config).await?)
        .build()
        .context("failed to build enrichment engine")?;

    tracing::info!(
        "{} intelligence sources registered, {} concurrent calls",
        enricher.sources().len(),
        enricher.max_concurrent()
    );

    // Build application state
    let jobs = Arc::new(jobs::JobStore::new(config.job_timeout(), config.job_retention()));
    jobs::spawn_pruner(jobs.clone());

    let state = AppState {
        enricher: Arc::new(enricher),
        jobs,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis when configured and compiled in, in-process otherwise
async fn result_cache(config: &config::Config) -> anyhow::Result<Arc<dyn ResultCache>> {
    match &config.redis_url {
        #[cfg(feature = "redis")]
        Some(url) => {
            let cache = enricher_core::RedisCache::connect(url)
                .await
                .context("failed to connect to Redis")?;
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            tracing::warn!("REDIS_URL set but built without the `redis` feature, using in-process cache");
            Ok(Arc::new(MemoryCache::default()))
        }
        None => Ok(Arc::new(MemoryCache::default())),
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub enricher: Arc<Enricher>,
    pub jobs: Arc<jobs::JobStore>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        // Search
        .route("/api/v1/search", post(handlers::search::submit))
        .route("/api/v1/search/:task_id", get(handlers::search::status))
        // Sources
        .route("/api/v1/sources", get(handlers::sources::list))
        // Cache
        .route("/api/v1/cache/invalidate", post(handlers::cache::invalidate))
        .route("/api/v1/cache", delete(handlers::cache::flush))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
