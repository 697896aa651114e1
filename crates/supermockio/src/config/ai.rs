//! Generative-AI collaborator settings.

use serde::{Deserialize, Serialize};

/// Settings for the AI example generator, read once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// Global switch; when off every AI path degrades to a fallback
    #[serde(default)]
    pub enabled: bool,
    /// Backend selector (only "gemini" is known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Token-bucket size, refilled every minute
    #[serde(default = "default_rate_limit_tokens")]
    pub rate_limit_tokens: u32,
    /// Upper bound for a single AI call, not counting rate-limit wait
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model_name() -> String {
    "gemini-1.5-flash".to_string()
}

pub(crate) fn default_rate_limit_tokens() -> u32 {
    15
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: None,
            api_key: None,
            model_name: default_model_name(),
            rate_limit_tokens: default_rate_limit_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
