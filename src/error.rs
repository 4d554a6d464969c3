use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::ai::AiError;
use crate::github::GithubError;
use crate::rate_limit::RateLimitDecision;
use crate::throttle;

pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited(RateLimitDecision),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] AiError),

    #[error(transparent)]
    Github(#[from] GithubError),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Github(_) => StatusCode::BAD_GATEWAY,
        }
    }

    // Message sent to the client; upstream details stay in the logs
    fn public_message(&self) -> String {
        match self {
            AppError::Upstream(_) => "Failed to process AI request".to_string(),
            AppError::Github(_) => "GitHub request failed".to_string(),
            AppError::Persistence(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.public_message() }));
        let mut response = (status, body).into_response();

        if let AppError::RateLimited(decision) = &self {
            throttle::apply_headers(response.headers_mut(), decision);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_maps_to_429_with_headers() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: 1_700_000_060_000,
        };
        let response = AppError::RateLimited(decision).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-limit"], "20");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-reset"], "1700000060000");
    }

    #[test]
    fn upstream_errors_hide_details() {
        let err = AppError::Upstream(AiError::Status {
            status: 503,
            body: "quota".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to process AI request");
    }
}
