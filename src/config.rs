use std::time::Duration;

use clap::Parser;

use crate::ai::{GenerationConfig, GEMINI_BASE_URL};
use crate::rate_limit::{CategoryLimit, RateLimitConfig};

// Longest accepted rate limit window: one year
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "codelens-gateway")]
#[command(about = "AI code analysis gateway with per-user rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Header set by the upstream identity proxy carrying the user id
    #[arg(long, env = "CODELENS_USER_HEADER", default_value = "x-user-id")]
    pub user_header: String,

    // Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_EMBEDDING_MODEL", default_value = "text-embedding-004")]
    pub gemini_embedding_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    // Sampling defaults applied to every completion
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long, default_value_t = 2048)]
    pub max_output_tokens: u32,

    #[arg(long, env = "GITHUB_CLIENT_ID", default_value = "")]
    pub github_client_id: String,

    #[arg(long, env = "GITHUB_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub github_client_secret: String,

    // Default category: max requests per window
    #[arg(long, default_value_t = 100)]
    pub rate_limit: u32,

    // Default category window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // AI category: max requests per window
    #[arg(long, default_value_t = 20)]
    pub ai_rate_limit: u32,

    // AI category window in seconds
    #[arg(long, default_value_t = 60)]
    pub ai_rate_window: u64,

    // How often expired counters are swept, in seconds
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // AI request rows kept per user, oldest evicted first
    #[arg(long, default_value_t = 500)]
    pub audit_retention: usize,

    // Used when RUST_LOG is not set
    #[arg(long, env = "CODELENS_LOG", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn rate_limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            default: CategoryLimit {
                max_requests: self.rate_limit,
                window_ms: secs_to_ms(self.rate_window),
            },
            ai: CategoryLimit {
                max_requests: self.ai_rate_limit,
                window_ms: secs_to_ms(self.ai_rate_window),
            },
        }
    }

    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            ..GenerationConfig::default()
        }
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    // Limits must be positive, windows between one second and MAX_WINDOW_SECS
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit == 0 || self.ai_rate_limit == 0 {
            return Err("rate limits must be greater than zero".to_string());
        }
        if self.rate_window == 0 || self.ai_rate_window == 0 {
            return Err("rate windows must be greater than zero".to_string());
        }
        if self.rate_window > MAX_WINDOW_SECS || self.ai_rate_window > MAX_WINDOW_SECS {
            return Err(format!(
                "rate windows must be at most {} seconds",
                MAX_WINDOW_SECS
            ));
        }
        if self.audit_retention == 0 {
            return Err("audit retention must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_limits() {
        let args = Args::parse_from(["codelens-gateway"]);
        assert_eq!(args.rate_limits(), RateLimitConfig::default());
        assert_eq!(args.sweep_period(), Duration::from_secs(300));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let args = Args::parse_from(["codelens-gateway", "--ai-rate-limit", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let args = Args::parse_from([
            "codelens-gateway",
            "--ai-rate-window",
            "18446744073709551615",
        ]);
        assert!(args.validate().is_err());

        let one_year = MAX_WINDOW_SECS.to_string();
        let args = Args::parse_from(["codelens-gateway", "--rate-window", one_year.as_str()]);
        assert!(args.validate().is_ok());

        let too_long = (MAX_WINDOW_SECS + 1).to_string();
        let args = Args::parse_from(["codelens-gateway", "--rate-window", too_long.as_str()]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn zero_audit_retention_is_rejected() {
        let args = Args::parse_from(["codelens-gateway", "--audit-retention", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn custom_windows_are_converted_to_millis() {
        let args = Args::parse_from(["codelens-gateway", "--ai-rate-window", "5"]);
        assert_eq!(args.rate_limits().ai.window_ms, 5_000);
    }
}
