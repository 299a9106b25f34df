//! Axum router and shared state.
//!
//! # Endpoints
//!
//! | Method  | Path | Description |
//! |---------|------|-------------|
//! | `GET`   | `/health` | Liveness check |
//! | `POST`  | `/moderate-content` | Score content, restrict and report when flagged |
//! | `GET`   | `/tenants/{tenant_id}/banned-words` | List banned words |
//! | `POST`  | `/tenants/{tenant_id}/banned-words` | Add a banned word |
//! | `PATCH` | `/tenants/{tenant_id}/banned-words/{id}` | Activate or deactivate a word |
//! | `GET`   | `/tenants/{tenant_id}/reports` | List moderation reports |
//! | `POST`  | `/reports/{id}/review` | Confirm or dismiss a report |
//! | `GET`   | `/tenants/{tenant_id}/content/{kind}/{content_id}/flag` | Restriction state |

use super::handlers;
use crate::core::moderation::ModerationService;
use crate::core::rate_limit::RateLimiter;
use crate::infra::moderation::SqliteModerationStore;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub moderation: Arc<ModerationService<SqliteModerationStore>>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/moderate-content", post(handlers::moderate_content))
        .route(
            "/tenants/{tenant_id}/banned-words",
            get(handlers::list_banned_words).post(handlers::add_banned_word),
        )
        .route(
            "/tenants/{tenant_id}/banned-words/{id}",
            patch(handlers::update_banned_word),
        )
        .route("/tenants/{tenant_id}/reports", get(handlers::list_reports))
        .route("/reports/{id}/review", post(handlers::review_report))
        .route(
            "/tenants/{tenant_id}/content/{kind}/{content_id}/flag",
            get(handlers::content_flag),
        )
        .with_state(state)
}
