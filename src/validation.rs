use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{
    AnalyzeCodeRequest, ConnectGithubRequest, EmbedRequest, GenerateCodeRequest,
    SummarizeCodeRequest,
};

pub const MAX_INPUT_CHARS: usize = 50_000;
const MAX_LANGUAGE_CHARS: usize = 50;

/// Field-level checks run after a payload has been decoded.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Decode a raw JSON body and validate it.
///
/// Handlers take the body as bytes so that decoding happens after the rate
/// limit check, never before it.
pub fn parse_payload<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;
    payload.validate().map_err(AppError::Validation)?;
    Ok(payload)
}

fn required(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.chars().count() > max {
        return Err(format!("{} must be at most {} characters", field, max));
    }
    Ok(())
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Result<(), String> {
    match value {
        Some(v) if v.chars().count() > max => {
            Err(format!("{} must be at most {} characters", field, max))
        }
        _ => Ok(()),
    }
}

impl Validate for AnalyzeCodeRequest {
    fn validate(&self) -> Result<(), String> {
        required("code", &self.code, MAX_INPUT_CHARS)?;
        required("language", &self.language, MAX_LANGUAGE_CHARS)?;
        optional("repositoryId", self.repository_id.as_deref(), 200)
    }
}

impl Validate for GenerateCodeRequest {
    fn validate(&self) -> Result<(), String> {
        required("prompt", &self.prompt, MAX_INPUT_CHARS)?;
        required("language", &self.language, MAX_LANGUAGE_CHARS)?;
        optional("context", self.context.as_deref(), MAX_INPUT_CHARS)
    }
}

impl Validate for SummarizeCodeRequest {
    fn validate(&self) -> Result<(), String> {
        required("code", &self.code, MAX_INPUT_CHARS)?;
        optional("language", self.language.as_deref(), MAX_LANGUAGE_CHARS)
    }
}

impl Validate for EmbedRequest {
    fn validate(&self) -> Result<(), String> {
        required("text", &self.text, MAX_INPUT_CHARS)
    }
}

impl Validate for ConnectGithubRequest {
    fn validate(&self) -> Result<(), String> {
        required("code", &self.code, 512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisType;

    #[test]
    fn accepts_valid_analyze_request() {
        let req: AnalyzeCodeRequest = parse_payload(
            br#"{"code":"let x = 1;","language":"rust","analysisType":"bugs"}"#,
        )
        .expect("valid payload");
        assert_eq!(req.analysis_type, AnalysisType::Bugs);
    }

    #[test]
    fn analysis_type_defaults_to_quality() {
        let req: AnalyzeCodeRequest =
            parse_payload(br#"{"code":"x","language":"go"}"#).expect("valid payload");
        assert_eq!(req.analysis_type, AnalysisType::Quality);
    }

    #[test]
    fn rejects_blank_code() {
        let err = parse_payload::<AnalyzeCodeRequest>(br#"{"code":"  ","language":"go"}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "code is required"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_payload::<EmbedRequest>(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_oversized_input() {
        let body = serde_json::json!({ "text": "a".repeat(MAX_INPUT_CHARS + 1) }).to_string();
        let err = parse_payload::<EmbedRequest>(body.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("at most")));
    }

    #[test]
    fn rejects_unknown_analysis_type() {
        let err = parse_payload::<AnalyzeCodeRequest>(
            br#"{"code":"x","language":"go","analysisType":"style"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
