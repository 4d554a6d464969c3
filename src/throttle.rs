use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::AppError;
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::rate_limit::{Category, RateLimitDecision, RateLimiter};

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// Advertised limit is the AI quota for every category; existing clients read it as-is.
pub const ADVERTISED_LIMIT: HeaderValue = HeaderValue::from_static("20");

/// Run the limiter for one request, turning a rejection into `AppError::RateLimited`.
pub fn enforce(
    limiter: &RateLimiter,
    principal: &str,
    category: Category,
) -> Result<RateLimitDecision, AppError> {
    let decision = limiter.check(principal, category);
    if !decision.allowed {
        RATE_LIMITED_TOTAL.inc();
        tracing::warn!(principal, %category, reset_at = decision.reset_at, "rate limit exceeded");
        return Err(AppError::RateLimited(decision));
    }
    Ok(decision)
}

pub fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(LIMIT_HEADER, ADVERTISED_LIMIT);
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_at));
}
