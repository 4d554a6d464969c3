use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser; // for cli
use tracing_subscriber::EnvFilter;

use codelens_gateway::ai::GeminiProvider;
use codelens_gateway::audit::InMemoryAuditStore;
use codelens_gateway::auth::TrustedHeaderAuthenticator;
use codelens_gateway::config::Args;
use codelens_gateway::github::{GithubOAuth, InMemoryRepositoryStore};
use codelens_gateway::handlers;
use codelens_gateway::rate_limit::{RateLimiter, spawn_sweeper};
use codelens_gateway::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // parse cli arguments
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    args.validate()?;

    let client = reqwest::Client::new();
    let limits = args.rate_limits();
    let rate_limiter = Arc::new(RateLimiter::with_system_clock(limits));

    if args.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set, AI endpoints will fail");
    }

    // creating shared state
    let state = Arc::new(AppState {
        rate_limiter: rate_limiter.clone(),
        authenticator: Arc::new(TrustedHeaderAuthenticator::new(&args.user_header)?),
        ai: Arc::new(GeminiProvider::new(
            client.clone(),
            args.gemini_base_url.clone(),
            args.gemini_api_key.clone(),
            args.gemini_model.clone(),
            args.gemini_embedding_model.clone(),
        )),
        generation: args.generation(),
        audit: Arc::new(InMemoryAuditStore::with_retention(args.audit_retention)),
        github: Arc::new(GithubOAuth::new(
            client,
            args.github_client_id.clone(),
            args.github_client_secret.clone(),
        )),
        repositories: Arc::new(InMemoryRepositoryStore::new()),
    });

    // spawn the background sweeper
    let sweeper = spawn_sweeper(rate_limiter, args.sweep_period());

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, model = %args.gemini_model, "CodeLens gateway listening");
    tracing::info!(
        ai_limit = limits.ai.max_requests,
        ai_window_ms = limits.ai.window_ms,
        default_limit = limits.default.max_requests,
        default_window_ms = limits.default.window_ms,
        "rate limits configured"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
