use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;

pub const GITHUB_OAUTH_URL: &str = "https://github.com";
pub const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "codelens-gateway";

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GitHub OAuth error: {0}")]
    OAuth(String),

    #[error("GitHub OAuth app is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// A principal's linked GitHub account
#[derive(Debug, Clone)]
pub struct GithubConnection {
    pub access_token: String,
    pub user: GithubUser,
    pub connected_at: DateTime<Utc>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<String, GithubError>;

    async fn user_info(&self, access_token: &str) -> Result<GithubUser, GithubError>;

    async fn list_repositories(&self, access_token: &str) -> Result<Vec<Repository>, GithubError>;
}

pub struct GithubOAuth {
    client: reqwest::Client,
    oauth_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl GithubOAuth {
    pub fn new(client: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self::with_urls(client, client_id, client_secret, GITHUB_OAUTH_URL, GITHUB_API_URL)
    }

    pub fn with_urls(
        client: reqwest::Client,
        client_id: String,
        client_secret: String,
        oauth_url: &str,
        api_url: &str,
    ) -> Self {
        Self {
            client,
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, GithubError> {
        let res = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(access_token)
            .header("accept", "application/vnd.github+json")
            .header("user-agent", USER_AGENT)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.json::<T>().await?)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[async_trait]
impl OAuthProvider for GithubOAuth {
    async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(GithubError::NotConfigured);
        }

        let res = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_url))
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT)
            .timeout(Duration::from_secs(15))
            .json(&json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // GitHub reports bad codes with a 200 and an error field
        let token: TokenResponse = res.json().await?;
        match (token.access_token, token.error) {
            (Some(access_token), None) => Ok(access_token),
            (_, Some(error)) => Err(GithubError::OAuth(
                token.error_description.unwrap_or(error),
            )),
            (None, None) => Err(GithubError::OAuth("no access token returned".to_string())),
        }
    }

    async fn user_info(&self, access_token: &str) -> Result<GithubUser, GithubError> {
        self.get_json("/user", access_token).await
    }

    async fn list_repositories(&self, access_token: &str) -> Result<Vec<Repository>, GithubError> {
        self.get_json("/user/repos?per_page=100&sort=updated", access_token)
            .await
    }
}

/// Per-principal GitHub connection and synced repositories.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn save_connection(&self, principal_id: &str, connection: GithubConnection)
    -> Result<(), AppError>;

    async fn connection(&self, principal_id: &str) -> Result<Option<GithubConnection>, AppError>;

    /// Replaces whatever was synced before.
    async fn replace_repositories(
        &self,
        principal_id: &str,
        repositories: Vec<Repository>,
    ) -> Result<(), AppError>;

    async fn repositories(&self, principal_id: &str) -> Result<Vec<Repository>, AppError>;
}

#[derive(Default)]
pub struct InMemoryRepositoryStore {
    connections: DashMap<String, GithubConnection>,
    repositories: DashMap<String, Vec<Repository>>,
}

impl InMemoryRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryStore for InMemoryRepositoryStore {
    async fn save_connection(
        &self,
        principal_id: &str,
        connection: GithubConnection,
    ) -> Result<(), AppError> {
        self.connections.insert(principal_id.to_string(), connection);
        Ok(())
    }

    async fn connection(&self, principal_id: &str) -> Result<Option<GithubConnection>, AppError> {
        Ok(self.connections.get(principal_id).map(|c| c.clone()))
    }

    async fn replace_repositories(
        &self,
        principal_id: &str,
        repositories: Vec<Repository>,
    ) -> Result<(), AppError> {
        self.repositories.insert(principal_id.to_string(), repositories);
        Ok(())
    }

    async fn repositories(&self, principal_id: &str) -> Result<Vec<Repository>, AppError> {
        Ok(self
            .repositories
            .get(principal_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn oauth(server: &MockServer) -> GithubOAuth {
        GithubOAuth::with_urls(
            reqwest::Client::new(),
            "client".to_string(),
            "secret".to_string(),
            &server.uri(),
            &server.uri(),
        )
    }

    #[tokio::test]
    async fn exchanges_code_for_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_abc",
                "token_type": "bearer",
                "scope": "repo"
            })))
            .mount(&server)
            .await;

        assert_eq!(oauth(&server).exchange_code("code-1").await.unwrap(), "gho_abc");
    }

    #[tokio::test]
    async fn bad_verification_code_is_an_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let err = oauth(&server).exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, GithubError::OAuth(msg) if msg.contains("incorrect or expired")));
    }

    #[tokio::test]
    async fn lists_repositories_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(header("authorization", "Bearer gho_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 1,
                "name": "codelens",
                "full_name": "octo/codelens",
                "private": false,
                "html_url": "https://github.com/octo/codelens",
                "language": "Rust"
            }])))
            .mount(&server)
            .await;

        let repos = oauth(&server).list_repositories("gho_abc").await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].full_name, "octo/codelens");
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let client = GithubOAuth::new(reqwest::Client::new(), String::new(), String::new());
        assert!(matches!(
            client.exchange_code("x").await,
            Err(GithubError::NotConfigured)
        ));
    }
}
