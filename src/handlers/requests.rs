use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use super::throttled_json;
use crate::error::AppError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::Envelope;
use crate::rate_limit::Category;
use crate::state::AppState;
use crate::throttle;

const DEFAULT_PAGE: usize = 20;
const MAX_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

// GET /api/requests - caller's AI request history
pub async fn list_requests_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    REQUEST_TOTAL.inc();
    let principal = state.authenticator.authenticate(&headers).await?;
    let decision = throttle::enforce(&state.rate_limiter, &principal, Category::Default)?;

    let limit = params.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let rows = state.audit.list_requests(&principal, limit).await?;
    Ok(throttled_json(&decision, Envelope::ok(rows)))
}
