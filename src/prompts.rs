use crate::models::{AnalysisType, AnalyzeCodeRequest, GenerateCodeRequest, SummarizeCodeRequest};

pub fn analyze_prompt(req: &AnalyzeCodeRequest) -> String {
    let focus = match req.analysis_type {
        AnalysisType::Quality => {
            "code quality: readability, naming, structure, duplication and maintainability"
        }
        AnalysisType::Security => {
            "security: injection risks, unsafe input handling, secrets in code and auth flaws"
        }
        AnalysisType::Performance => {
            "performance: algorithmic complexity, unnecessary allocations, blocking calls and hot loops"
        }
        AnalysisType::Bugs => {
            "bugs: logic errors, unhandled edge cases, off-by-one mistakes and error handling gaps"
        }
    };

    format!(
        "You are an expert {lang} code reviewer. Analyze the following code with a focus on {focus}.\n\
         Respond with a short overall assessment, then a numbered list of findings. \
         For each finding give a severity (low, medium, high), the affected lines and a concrete fix.\n\n\
         ```{lang}\n{code}\n```",
        lang = req.language,
        focus = focus,
        code = req.code,
    )
}

pub fn generate_prompt(req: &GenerateCodeRequest) -> String {
    let mut prompt = format!(
        "You are an expert {lang} developer. Write {lang} code for the following request:\n\n{task}\n",
        lang = req.language,
        task = req.prompt,
    );
    if let Some(context) = req.context.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nExisting code for context:\n```");
        prompt.push_str(&req.language);
        prompt.push('\n');
        prompt.push_str(context);
        prompt.push_str("\n```\n");
    }
    prompt.push_str(
        "\nReturn a single code block followed by a brief explanation of the approach.",
    );
    prompt
}

pub fn summarize_prompt(req: &SummarizeCodeRequest) -> String {
    let lang = req.language.as_deref().unwrap_or("");
    let origin = match req.file_path.as_deref() {
        Some(path) => format!(" from `{}`", path),
        None => String::new(),
    };
    format!(
        "Summarize the following code{origin}. Describe its purpose, its main components and \
         how they interact, and any notable dependencies. Keep it under 200 words.\n\n\
         ```{lang}\n{code}\n```",
        origin = origin,
        lang = lang,
        code = req.code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_prompt_mentions_focus_and_code() {
        let req = AnalyzeCodeRequest {
            code: "fn main() {}".to_string(),
            language: "rust".to_string(),
            analysis_type: AnalysisType::Security,
            repository_id: None,
        };
        let prompt = analyze_prompt(&req);
        assert!(prompt.contains("security"));
        assert!(prompt.contains("```rust\nfn main() {}\n```"));
    }

    #[test]
    fn generate_prompt_skips_blank_context() {
        let req = GenerateCodeRequest {
            prompt: "parse a csv".to_string(),
            language: "python".to_string(),
            context: Some("   ".to_string()),
        };
        assert!(!generate_prompt(&req).contains("Existing code"));
    }

    #[test]
    fn summarize_prompt_names_file() {
        let req = SummarizeCodeRequest {
            code: "x = 1".to_string(),
            language: None,
            file_path: Some("src/app.py".to_string()),
        };
        assert!(summarize_prompt(&req).contains("from `src/app.py`"));
    }
}
