//! Environment-backed application configuration.
//!
//! Everything the pipeline needs is collected here once and injected through
//! constructors, so no module-level client or key state exists.

use std::time::Duration;

use crate::sentiment::RetryPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub huggingface_api_url: String,
    pub huggingface_api_key: String,
    pub gemini_api_url: String,
    pub gemini_api_key: String,
    pub translate_api_url: String,
    /// Per-request timeout for all external calls.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            huggingface_api_url: env_or(
                "HUGGINGFACE_API_URL",
                "https://api-inference.huggingface.co/models/cardiffnlp/twitter-roberta-base-sentiment-latest",
            ),
            huggingface_api_key: env_or("HUGGINGFACE_API_KEY", ""),
            gemini_api_url: env_or(
                "GEMINI_API_URL",
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent",
            ),
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
            translate_api_url: env_or("TRANSLATE_API_URL", "http://localhost:5001"),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
