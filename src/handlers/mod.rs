mod admin;
mod analyze;
mod health;
mod metrics;

pub use admin::{clear_handler, sweep_handler};
pub use analyze::{analyze_phrase_handler, analyze_writing_handler, panglish_handler, rate_limit_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;

use axum::{Router, routing::{delete, get, post}};
use std::sync::Arc;
use crate::state::AppState;

// Build the router. Cache administration is only mounted when a token is configured.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/analyze-phrase", post(analyze_phrase_handler))
        .route("/api/analyze-writing", post(analyze_writing_handler))
        .route("/api/panglish", post(panglish_handler))
        .route("/api/rate-limit/{feature}", get(rate_limit_handler));

    if state.admin_token.is_some() {
        app = app
            .route("/api/cache/sweep", post(sweep_handler))
            .route("/api/cache", delete(clear_handler));
    }

    app.with_state(state)
}
