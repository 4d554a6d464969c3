use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Response,
};
use serde_json::json;

use super::throttled_json;
use crate::error::AppError;
use crate::github::GithubConnection;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{ConnectGithubRequest, Envelope};
use crate::rate_limit::{Category, RateLimitDecision};
use crate::state::AppState;
use crate::throttle;
use crate::validation::parse_payload;

async fn admit(state: &AppState, headers: &HeaderMap) -> Result<(String, RateLimitDecision), AppError> {
    REQUEST_TOTAL.inc();
    let principal = state.authenticator.authenticate(headers).await?;
    let decision = throttle::enforce(&state.rate_limiter, &principal, Category::Default)?;
    Ok((principal, decision))
}

// POST /api/github/connect - finish the OAuth dance for the caller
pub async fn connect_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;
    let req: ConnectGithubRequest = parse_payload(&body)?;

    let access_token = state.github.exchange_code(&req.code).await?;
    let user = state.github.user_info(&access_token).await?;

    tracing::info!(principal, github_login = %user.login, "GitHub account connected");
    state
        .repositories
        .save_connection(
            &principal,
            GithubConnection {
                access_token,
                user: user.clone(),
                connected_at: chrono::Utc::now(),
            },
        )
        .await?;

    Ok(throttled_json(&decision, Envelope::ok(user)))
}

// POST /api/github/sync - refresh the caller's repository list
pub async fn sync_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;

    let connection = state
        .repositories
        .connection(&principal)
        .await?
        .ok_or_else(|| AppError::NotFound("GitHub account not connected".to_string()))?;

    let repositories = state.github.list_repositories(&connection.access_token).await?;
    let synced = repositories.len();
    state
        .repositories
        .replace_repositories(&principal, repositories)
        .await?;

    tracing::info!(principal, synced, "repositories synced");
    Ok(throttled_json(&decision, Envelope::ok(json!({ "synced": synced }))))
}

// GET /api/github/repos
pub async fn list_repos_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;
    let repositories = state.repositories.repositories(&principal).await?;
    Ok(throttled_json(&decision, Envelope::ok(repositories)))
}
