use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI provider returned no content")]
    EmptyResponse,

    #[error("AI provider is not configured")]
    NotConfigured,
}

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2048,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, rename = "promptTokenCount")]
    pub prompt_tokens: u32,
    #[serde(default, rename = "candidatesTokenCount")]
    pub completion_tokens: u32,
    #[serde(default, rename = "totalTokenCount")]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<Completion, AiError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
}

// Gemini REST client
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl GeminiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<T, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }

        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(60))
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res.json::<T>().await?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Usage,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Embedding,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<Completion, AiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": config,
        });

        let response: GenerateContentResponse = self.post(url, body).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        Ok(Completion {
            text,
            usage: response.usage_metadata,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.embedding_model);
        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
        });

        let response: EmbedContentResponse = self.post(url, body).await?;
        if response.embedding.values.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(response.embedding.values)
    }
}
