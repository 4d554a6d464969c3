use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::Usage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Quality,
    Security,
    Performance,
    Bugs,
}

// POST /api/ai/analyze
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCodeRequest {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub repository_id: Option<String>,
}

// POST /api/ai/generate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    pub prompt: String,
    pub language: String,
    #[serde(default)]
    pub context: Option<String>,
}

// POST /api/ai/summarize
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeCodeRequest {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

// POST /api/ai/embed
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedRequest {
    pub text: String,
}

// POST /api/github/connect
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectGithubRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionResult {
    pub text: String,
    pub usage: Usage,
    #[serde(rename = "latencyMs")]
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingResult {
    pub embedding: Vec<f32>,
    pub dimensions: usize,
}

// Success envelope shared by every endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            request_id: None,
        }
    }

    pub fn with_request(data: T, request_id: Uuid) -> Self {
        Self {
            success: true,
            data,
            request_id: Some(request_id),
        }
    }
}
