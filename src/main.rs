// This is the entry point of the content moderation service.
//
// **Architecture Overview:**
// - `core/` = Business logic (scoring, review workflow, rate limiting)
// - `infra/` = Implementations of core traits (SQLite)
// - `http/` = HTTP adapters (axum router and handlers)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Serve the HTTP API

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::AppConfig;
use crate::core::moderation::ModerationService;
use crate::core::rate_limit::InMemoryRateLimiter;
use crate::http::{build_router, AppState};
use crate::infra::moderation::SqliteModerationStore;
use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory '{}'", config.data_dir))?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to '{}'", config.database_url))?;
    let store = SqliteModerationStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to migrate moderation DB")?;

    let moderation_service = Arc::new(ModerationService::new(store));
    let rate_limiter = Arc::new(InMemoryRateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window,
    ));

    let state = AppState {
        moderation: Arc::clone(&moderation_service),
        rate_limiter: rate_limiter.clone(),
    };

    // Background sweep so idle clients don't pile up in the limiter.
    let sweep_every = config.rate_limit_window;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_every).await;
            let removed = rate_limiter.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired rate limit windows");
            }
        }
    });

    // ========================================================================
    // HTTP SERVER
    // ========================================================================

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "Moderation service listening");
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
