#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{self, Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
};
use codelens_gateway::ai::{AiError, AiProvider, Completion, GenerationConfig, Usage};
use codelens_gateway::audit::InMemoryAuditStore;
use codelens_gateway::auth::TrustedHeaderAuthenticator;
use codelens_gateway::clock::ManualClock;
use codelens_gateway::github::{
    GithubError, GithubUser, InMemoryRepositoryStore, OAuthProvider, Repository,
};
use codelens_gateway::handlers;
use codelens_gateway::rate_limit::{RateLimitConfig, RateLimiter};
use codelens_gateway::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

pub const START_MS: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct FakeAi {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl AiProvider for FakeAi {
    async fn complete(&self, prompt: &str, _config: &GenerationConfig) -> Result<Completion, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("prompts lock").push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(AiError::Status {
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        Ok(Completion {
            text: "looks good".to_string(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 3,
                total_tokens: 13,
            },
        })
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AiError::EmptyResponse);
        }
        Ok(vec![0.1, 0.2, 0.3])
    }
}

#[derive(Default)]
pub struct FakeGithub {
    pub exchanged: AtomicUsize,
}

#[async_trait]
impl OAuthProvider for FakeGithub {
    async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        self.exchanged.fetch_add(1, Ordering::SeqCst);
        if code == "bad" {
            return Err(GithubError::OAuth("bad_verification_code".to_string()));
        }
        Ok(format!("token-{}", code))
    }

    async fn user_info(&self, _access_token: &str) -> Result<GithubUser, GithubError> {
        Ok(GithubUser {
            id: 7,
            login: "octocat".to_string(),
            name: Some("The Octocat".to_string()),
            avatar_url: None,
        })
    }

    async fn list_repositories(&self, access_token: &str) -> Result<Vec<Repository>, GithubError> {
        assert!(access_token.starts_with("token-"));
        Ok(vec![Repository {
            id: 1,
            name: "hello-world".to_string(),
            full_name: "octocat/hello-world".to_string(),
            description: None,
            language: Some("Rust".to_string()),
            private: false,
            html_url: "https://github.com/octocat/hello-world".to_string(),
            default_branch: Some("main".to_string()),
            stargazers_count: 3,
            updated_at: None,
        }])
    }
}

pub struct Harness {
    pub app: Router,
    pub clock: Arc<ManualClock>,
    pub limiter: Arc<RateLimiter>,
    pub audit: Arc<InMemoryAuditStore>,
    pub ai: Arc<FakeAi>,
    pub github: Arc<FakeGithub>,
}

pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(START_MS));
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default(), clock.clone()));
    let audit = Arc::new(InMemoryAuditStore::new());
    let ai = Arc::new(FakeAi::default());
    let github = Arc::new(FakeGithub::default());

    let state = Arc::new(AppState {
        rate_limiter: limiter.clone(),
        authenticator: Arc::new(TrustedHeaderAuthenticator::new("x-user-id").expect("header")),
        ai: ai.clone(),
        generation: GenerationConfig::default(),
        audit: audit.clone(),
        github: github.clone(),
        repositories: Arc::new(InMemoryRepositoryStore::new()),
    });

    Harness {
        app: handlers::router(state),
        clock,
        limiter,
        audit,
        ai,
        github,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .unwrap_or_else(|| panic!("missing header {}", name))
            .to_str()
            .expect("ascii header")
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = builder
        .body(Body::from(body.unwrap_or("").to_string()))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn analyze(app: &Router, user: &str) -> TestResponse {
    send(
        app,
        Method::POST,
        "/api/ai/analyze",
        Some(user),
        Some(r#"{"code":"fn add(a: i32, b: i32) -> i32 { a + b }","language":"rust"}"#),
    )
    .await
}
