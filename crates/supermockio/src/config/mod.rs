//! Configuration types for SuperMockio.
//!
//! Settings come from command-line flags, each backed by an environment
//! variable through clap:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `HOST`, `PORT` | listener address (default `0.0.0.0:3000`) |
//! | `AI_GENERATION_ENABLED` | global AI switch |
//! | `AI_SERVICE_NAME` | AI backend (`gemini`) |
//! | `AI_API_KEY`, `AI_MODEL_NAME` | backend credentials and model |
//! | `AI_RATE_LIMIT_TOKENS` | AI calls per minute (default 15) |
//! | `AI_TIMEOUT_SECS` | per-call timeout (default 30) |
//! | `LOG_JSON` | JSON log lines |
//!
//! `MOCKER_STRICT_MODE` is not a flag: the dispatcher re-reads it on every
//! request.

mod ai;
mod listen;

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub use ai::AiConfig;
pub use listen::ListenConfig;

pub const ENV_STRICT_MODE: &str = "MOCKER_STRICT_MODE";

/// Command-line flags and their environment fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "supermockio", version, about = "Mock servers from OpenAPI documents")]
pub struct Args {
    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Generate missing examples with the AI backend (`true` or `1`)
    #[arg(
        long,
        env = "AI_GENERATION_ENABLED",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = flag_value
    )]
    pub ai_generation_enabled: bool,

    /// AI backend name
    #[arg(long, env = "AI_SERVICE_NAME")]
    pub ai_service_name: Option<String>,

    #[arg(long, env = "AI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    #[arg(long, env = "AI_MODEL_NAME")]
    pub ai_model_name: Option<String>,

    /// AI calls allowed per minute
    #[arg(long, env = "AI_RATE_LIMIT_TOKENS", default_value_t = 15)]
    pub ai_rate_limit_tokens: u32,

    /// Timeout for one AI call, in seconds
    #[arg(long, env = "AI_TIMEOUT_SECS", default_value_t = 30)]
    pub ai_timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

fn flag_value(value: &str) -> Result<bool, String> {
    Ok(parse_flag(value))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl Config {
    /// Load configuration from the process environment alone.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let args = Args::try_parse_from(["supermockio"])?;
        Self::from_args(&args)
    }

    pub fn from_args(args: &Args) -> Result<Self, anyhow::Error> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        let mut ai = AiConfig {
            enabled: args.ai_generation_enabled,
            service_name: non_empty(&args.ai_service_name),
            api_key: non_empty(&args.ai_api_key),
            rate_limit_tokens: args.ai_rate_limit_tokens,
            timeout_secs: args.ai_timeout_secs,
            ..AiConfig::default()
        };
        if let Some(model) = non_empty(&args.ai_model_name) {
            ai.model_name = model;
        }

        let config = Config {
            listen: ListenConfig {
                host: args.host,
                port: args.port,
            },
            ai,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.ai.rate_limit_tokens == 0 {
            anyhow::bail!("AI_RATE_LIMIT_TOKENS must be greater than zero");
        }
        if self.ai.timeout_secs == 0 {
            anyhow::bail!("AI_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}

/// Dispatch policy source.
///
/// `Env` re-reads `MOCKER_STRICT_MODE` on every call so the flag can be
/// flipped on a running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictMode {
    #[default]
    Env,
    Fixed(bool),
}

impl StrictMode {
    pub fn is_enabled(&self) -> bool {
        match self {
            StrictMode::Env => std::env::var(ENV_STRICT_MODE)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            StrictMode::Fixed(enabled) => *enabled,
        }
    }
}

/// Boolean environment flag: `true` or `1`, case-insensitive.
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(flags: &[&str]) -> Result<Config, anyhow::Error> {
        let argv = std::iter::once("supermockio").chain(flags.iter().copied());
        Config::from_args(&Args::try_parse_from(argv)?)
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.listen.port, 3000);
        assert!(!config.ai.enabled);
        assert_eq!(config.ai.rate_limit_tokens, 15);
        assert_eq!(config.ai.timeout_secs, 30);
        assert!(config.ai.service_name.is_none());
    }

    #[test]
    #[serial]
    fn test_parse_ai_settings() {
        let config = parse(&[
            "--port",
            "8081",
            "--ai-generation-enabled",
            "true",
            "--ai-service-name",
            "gemini",
            "--ai-api-key",
            "secret",
            "--ai-model-name",
            "gemini-pro",
            "--ai-rate-limit-tokens",
            "60",
        ])
        .unwrap();

        assert_eq!(config.listen.port, 8081);
        assert!(config.ai.enabled);
        assert_eq!(config.ai.service_name.as_deref(), Some("gemini"));
        assert_eq!(config.ai.api_key.as_deref(), Some("secret"));
        assert_eq!(config.ai.model_name, "gemini-pro");
        assert_eq!(config.ai.rate_limit_tokens, 60);
    }

    #[test]
    #[serial]
    fn test_environment_backs_every_flag() {
        std::env::set_var("AI_GENERATION_ENABLED", "1");
        std::env::set_var("AI_SERVICE_NAME", "");
        std::env::set_var("AI_TIMEOUT_SECS", "5");
        std::env::set_var("PORT", "4000");
        let config = Config::from_env();
        for key in ["AI_GENERATION_ENABLED", "AI_SERVICE_NAME", "AI_TIMEOUT_SECS", "PORT"] {
            std::env::remove_var(key);
        }

        let config = config.unwrap();
        assert!(config.ai.enabled);
        assert!(config.ai.service_name.is_none());
        assert_eq!(config.ai.timeout_secs, 5);
        assert_eq!(config.listen.port, 4000);
    }

    #[test]
    #[serial]
    fn test_invalid_rate_limit_rejected() {
        assert!(parse(&["--ai-rate-limit-tokens", "lots"]).is_err());
        assert!(parse(&["--ai-rate-limit-tokens", "0"]).is_err());
    }

    #[test]
    #[serial]
    fn test_api_key_not_serialized() {
        let config = parse(&["--ai-api-key", "secret"]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" 1 "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("yes please"));
    }

    #[test]
    #[serial]
    fn test_strict_mode_reads_env_per_call() {
        std::env::set_var(ENV_STRICT_MODE, "true");
        assert!(StrictMode::Env.is_enabled());
        std::env::set_var(ENV_STRICT_MODE, "false");
        assert!(!StrictMode::Env.is_enabled());
        std::env::remove_var(ENV_STRICT_MODE);
        assert!(!StrictMode::Env.is_enabled());
    }

    #[test]
    fn test_fixed_strict_mode() {
        assert!(StrictMode::Fixed(true).is_enabled());
        assert!(!StrictMode::Fixed(false).is_enabled());
    }
}
