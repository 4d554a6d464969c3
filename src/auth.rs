use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};

use crate::error::AppError;

/// Resolves the caller of a request to a stable principal id.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<String, AppError>;
}

/// Trusts a header written by the identity proxy in front of the gateway.
pub struct TrustedHeaderAuthenticator {
    header: HeaderName,
}

impl TrustedHeaderAuthenticator {
    pub fn new(header: &str) -> Result<Self, String> {
        let header = HeaderName::try_from(header)
            .map_err(|e| format!("invalid user header {:?}: {}", header, e))?;
        Ok(Self { header })
    }
}

#[async_trait]
impl Authenticator for TrustedHeaderAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<String, AppError> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn reads_principal_from_header() {
        let auth = TrustedHeaderAuthenticator::new("x-user-id").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static(" user_123 "));
        assert_eq!(auth.authenticate(&headers).await.unwrap(), "user_123");
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_unauthorized() {
        let auth = TrustedHeaderAuthenticator::new("x-user-id").unwrap();
        let mut headers = HeaderMap::new();
        assert!(matches!(auth.authenticate(&headers).await, Err(AppError::Unauthorized)));
        headers.insert("x-user-id", HeaderValue::from_static("   "));
        assert!(matches!(auth.authenticate(&headers).await, Err(AppError::Unauthorized)));
    }

    #[test]
    fn rejects_invalid_header_name() {
        assert!(TrustedHeaderAuthenticator::new("bad header").is_err());
    }
}
