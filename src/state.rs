use std::sync::Arc;

use crate::ai::{AiProvider, GenerationConfig};
use crate::audit::AuditStore;
use crate::auth::Authenticator;
use crate::github::{OAuthProvider, RepositoryStore};
use crate::rate_limit::RateLimiter;

// app's shared state, built once at startup

pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub authenticator: Arc<dyn Authenticator>,
    pub ai: Arc<dyn AiProvider>,
    pub generation: GenerationConfig, // sampling defaults for completions
    pub audit: Arc<dyn AuditStore>,
    pub github: Arc<dyn OAuthProvider>,
    pub repositories: Arc<dyn RepositoryStore>,
}
