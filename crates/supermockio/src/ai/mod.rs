//! Generative-AI collaborator.
//!
//! The core only needs `ask(prompt) -> text`. [`AiGateway`] wraps a backend
//! with the global enable switch, the FIFO rate limiter and a per-call
//! timeout, so callers never wait indefinitely.

mod gemini;
mod rate_limit;

use crate::config::AiConfig;
use crate::error::AiError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use gemini::GeminiService;
pub use rate_limit::RateLimiter;

/// A text-in, text-out generative backend.
#[async_trait]
pub trait AiService: Send + Sync {
    fn name(&self) -> &str;

    async fn ask(&self, prompt: &str) -> Result<String, AiError>;
}

/// Select the backend named by `AI_SERVICE_NAME`.
pub fn build_service(config: &AiConfig) -> Result<Arc<dyn AiService>, AiError> {
    match config.service_name.as_deref() {
        Some("gemini") => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AiError::NotConfigured("AI_API_KEY environment variable is not set".to_string())
            })?;
            let service = GeminiService::new(
                api_key,
                config.model_name.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(service))
        }
        Some(other) => Err(AiError::NotConfigured(format!(
            "Unknown AI service '{other}'"
        ))),
        None => Err(AiError::NotConfigured(
            "Please set AI_SERVICE_NAME environment variable to select an AI service to use"
                .to_string(),
        )),
    }
}

/// Gated access to the AI backend.
pub struct AiGateway {
    enabled: bool,
    service: Option<Arc<dyn AiService>>,
    limiter: RateLimiter,
    timeout: Duration,
}

impl AiGateway {
    /// Gateway that always reports [`AiError::Disabled`].
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            service: None,
            limiter: RateLimiter::per_minute(crate::config::AiConfig::default().rate_limit_tokens),
            timeout: Duration::from_secs(1),
        }
    }

    /// Enabled gateway around an explicit backend.
    pub fn new(service: Arc<dyn AiService>, tokens_per_minute: u32, timeout: Duration) -> Self {
        Self {
            enabled: true,
            service: Some(service),
            limiter: RateLimiter::per_minute(tokens_per_minute),
            timeout,
        }
    }

    /// Build from configuration.
    ///
    /// A missing or unknown backend is not fatal: the gateway stays enabled
    /// and each call fails, which the callers turn into fallbacks.
    pub fn from_config(config: &AiConfig) -> Self {
        if !config.enabled {
            info!("AI generation is disabled");
            return Self::disabled();
        }

        let service = match build_service(config) {
            Ok(service) => {
                info!(
                    "AI generation enabled with '{}' ({} calls/min)",
                    service.name(),
                    config.rate_limit_tokens
                );
                Some(service)
            }
            Err(e) => {
                warn!("AI generation enabled but unusable: {}", e);
                None
            }
        };

        Self {
            enabled: true,
            service,
            limiter: RateLimiter::per_minute(config.rate_limit_tokens),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ask the backend, honoring the rate limit and timeout.
    ///
    /// Waiting for a rate-limit token is unbounded; the timeout applies to
    /// the backend call only.
    pub async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        if !self.enabled {
            return Err(AiError::Disabled);
        }
        let service = self.service.as_ref().ok_or_else(|| {
            AiError::NotConfigured("no AI service available".to_string())
        })?;

        self.limiter.acquire().await;
        match tokio::time::timeout(self.timeout, service.ask(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Strip markdown code fences from a model reply.
pub fn clean_reply(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}

/// Clean a model reply and parse it as JSON.
pub fn parse_json_reply(reply: &str) -> Result<Value, AiError> {
    let cleaned = clean_reply(reply);
    if cleaned.is_empty() {
        return Err(AiError::EmptyReply);
    }
    serde_json::from_str(&cleaned).map_err(|e| AiError::Parse(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedAi;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_reply_strips_fences() {
        assert_eq!(clean_reply("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(clean_reply("  plain  "), "plain");
    }

    #[test]
    fn test_parse_json_reply() {
        assert_eq!(
            parse_json_reply("```json\n[{\"a\": 1}]\n```").unwrap(),
            json!([{"a": 1}])
        );
        assert!(matches!(parse_json_reply("```\n```"), Err(AiError::EmptyReply)));
        assert!(matches!(
            parse_json_reply("Sure! Here is your example"),
            Err(AiError::Parse(_))
        ));
    }

    #[test]
    fn test_build_service_requires_name_and_key() {
        let mut config = AiConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(build_service(&config), Err(AiError::NotConfigured(_))));

        config.service_name = Some("gemini".to_string());
        assert!(matches!(build_service(&config), Err(AiError::NotConfigured(_))));

        config.api_key = Some("key".to_string());
        assert_eq!(build_service(&config).unwrap().name(), "gemini");

        config.service_name = Some("oracle".to_string());
        assert!(build_service(&config).is_err());
    }

    #[tokio::test]
    async fn test_disabled_gateway() {
        let gateway = AiGateway::disabled();
        assert!(!gateway.is_enabled());
        assert!(matches!(gateway.ask("hi").await, Err(AiError::Disabled)));
    }

    #[tokio::test]
    async fn test_enabled_without_backend_errors() {
        let gateway = AiGateway::from_config(&AiConfig {
            enabled: true,
            ..Default::default()
        });
        assert!(gateway.is_enabled());
        assert!(matches!(
            gateway.ask("hi").await,
            Err(AiError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_forwards_prompt() {
        let backend = Arc::new(ScriptedAi::replying("{}"));
        let gateway = AiGateway::new(backend.clone(), 10, Duration::from_secs(5));

        assert_eq!(gateway.ask("describe a pet").await.unwrap(), "{}");
        assert_eq!(backend.prompts.lock().as_slice(), ["describe a pet"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_timeout() {
        let backend = Arc::new(ScriptedAi::slow("{}", Duration::from_secs(60)));
        let gateway = AiGateway::new(backend, 10, Duration::from_secs(2));

        assert!(matches!(gateway.ask("slow").await, Err(AiError::Timeout(2))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_calls_do_not_time_out() {
        let backend = Arc::new(ScriptedAi::replying("{}"));
        let gateway = Arc::new(AiGateway::new(backend.clone(), 15, Duration::from_secs(30)));

        let calls = (0..25).map(|i| {
            let gateway = Arc::clone(&gateway);
            async move { gateway.ask(&format!("prompt {i}")).await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| matches!(r, Ok(reply) if reply == "{}")));
        assert_eq!(backend.prompts.lock().len(), 25);
    }
}
