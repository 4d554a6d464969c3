use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Response,
};
use uuid::Uuid;

use super::throttled_json;
use crate::audit::{AuditPatch, NewAuditRecord, RequestKind, input_digest};
use crate::error::AppError;
use crate::metrics::{AI_FAILURES, AI_LATENCY, REQUEST_TOTAL};
use crate::models::{
    AnalyzeCodeRequest, CompletionResult, EmbedRequest, EmbeddingResult, Envelope,
    GenerateCodeRequest, SummarizeCodeRequest,
};
use crate::prompts::{analyze_prompt, generate_prompt, summarize_prompt};
use crate::rate_limit::{Category, RateLimitDecision};
use crate::state::AppState;
use crate::throttle;
use crate::validation::parse_payload;

// Steps shared by every AI endpoint: who is calling, and may they?
async fn admit(state: &AppState, headers: &HeaderMap) -> Result<(String, RateLimitDecision), AppError> {
    REQUEST_TOTAL.inc();
    let principal = state.authenticator.authenticate(headers).await?;
    let decision = throttle::enforce(&state.rate_limiter, &principal, Category::Ai)?;
    Ok((principal, decision))
}

pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;
    let req: AnalyzeCodeRequest = parse_payload(&body)?;
    let prompt = analyze_prompt(&req);
    let record = new_record(&principal, RequestKind::Analyze, &req.code)
        .with_repository(req.repository_id);
    complete(&state, decision, record, prompt).await
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;
    let req: GenerateCodeRequest = parse_payload(&body)?;
    let record = new_record(&principal, RequestKind::Generate, &req.prompt);
    complete(&state, decision, record, generate_prompt(&req)).await
}

pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;
    let req: SummarizeCodeRequest = parse_payload(&body)?;
    let record = new_record(&principal, RequestKind::Summarize, &req.code);
    complete(&state, decision, record, summarize_prompt(&req)).await
}

pub async fn embed_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let (principal, decision) = admit(&state, &headers).await?;
    let req: EmbedRequest = parse_payload(&body)?;

    let id = state
        .audit
        .create_request(new_record(&principal, RequestKind::Embed, &req.text))
        .await?;
    let started = Instant::now();
    let result = state.ai.embed(&req.text).await;
    let latency_ms = observe_latency(started);

    match result {
        Ok(embedding) => {
            let output = format!("{} dimensions", embedding.len());
            state
                .audit
                .update_request(id, AuditPatch::completed(output, latency_ms))
                .await?;
            let data = EmbeddingResult {
                dimensions: embedding.len(),
                embedding,
            };
            Ok(throttled_json(&decision, Envelope::with_request(data, id)))
        }
        Err(e) => {
            fail_request(&state, id, &e.to_string(), latency_ms).await;
            Err(e.into())
        }
    }
}

async fn complete(
    state: &AppState,
    decision: RateLimitDecision,
    record: NewAuditRecord,
    prompt: String,
) -> Result<Response, AppError> {
    let principal = record.principal_id.clone();
    let kind = record.kind;
    let id = state.audit.create_request(record).await?;
    let started = Instant::now();
    let result = state.ai.complete(&prompt, &state.generation).await;
    let latency_ms = observe_latency(started);

    match result {
        Ok(completion) => {
            state
                .audit
                .update_request(id, AuditPatch::completed(completion.text.clone(), latency_ms))
                .await?;
            tracing::info!(%id, %principal, ?kind, latency_ms, "AI request completed");
            let data = CompletionResult {
                text: completion.text,
                usage: completion.usage,
                latency_ms,
            };
            Ok(throttled_json(&decision, Envelope::with_request(data, id)))
        }
        Err(e) => {
            fail_request(state, id, &e.to_string(), latency_ms).await;
            Err(e.into())
        }
    }
}

fn new_record(principal: &str, kind: RequestKind, input: &str) -> NewAuditRecord {
    NewAuditRecord {
        principal_id: principal.to_string(),
        kind,
        input_digest: input_digest(input),
        repository_id: None,
    }
}

// The provider error is what the caller sees, even if recording it fails
async fn fail_request(state: &AppState, id: Uuid, error: &str, latency_ms: u64) {
    AI_FAILURES.inc();
    tracing::warn!(%id, error, latency_ms, "AI request failed");
    if let Err(e) = state
        .audit
        .update_request(id, AuditPatch::failed(error.to_string(), latency_ms))
        .await
    {
        tracing::error!(%id, error = %e, "failed to record AI failure");
    }
}

fn observe_latency(started: Instant) -> u64 {
    let elapsed = started.elapsed();
    AI_LATENCY.observe(elapsed.as_secs_f64());
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
