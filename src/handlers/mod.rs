mod ai;
mod github;
mod health;
mod metrics;
mod requests;

use std::sync::Arc;

use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;
use crate::throttle;

pub use ai::{analyze_handler, embed_handler, generate_handler, summarize_handler};
pub use github::{connect_handler, list_repos_handler, sync_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use requests::list_requests_handler;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/ai/analyze", post(analyze_handler))
        .route("/api/ai/generate", post(generate_handler))
        .route("/api/ai/summarize", post(summarize_handler))
        .route("/api/ai/embed", post(embed_handler))
        .route("/api/requests", get(list_requests_handler))
        .route("/api/github/connect", post(connect_handler))
        .route("/api/github/sync", post(sync_handler))
        .route("/api/github/repos", get(list_repos_handler))
        .with_state(state)
}

// JSON body plus the X-RateLimit-* headers of the admitting decision
fn throttled_json<T: Serialize>(decision: &RateLimitDecision, body: T) -> Response {
    let mut response = Json(body).into_response();
    throttle::apply_headers(response.headers_mut(), decision);
    response
}
