//! Provider selection and per-provider model defaults

use super::{AnthropicService, LlmError, LlmService, OpenAIService, ProxyCacheOptions};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// LLM provider enumeration, one per wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    /// Content-block protocol
    #[default]
    Anthropic,
    /// Chat-message protocol (also used for OpenAI-compatible proxies)
    OpenAI,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAI => "OpenAI",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Model used for capability work when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
            Provider::OpenAI => "gpt-4o",
        }
    }

    /// Cheap model used for classification and direct replies
    pub fn fast_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-haiku-20241022",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }

    /// Build the adapter for this provider. Called once per model at startup.
    pub fn build_service(
        self,
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
        cache: Option<ProxyCacheOptions>,
    ) -> Result<Arc<dyn LlmService>, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::auth(format!(
                "{model} requires {}",
                self.api_key_env_var()
            )));
        }
        Ok(match self {
            Provider::Anthropic => Arc::new(AnthropicService::new(api_key, model, base_url)?),
            Provider::OpenAI => {
                Arc::new(OpenAIService::new(api_key, model, base_url)?.with_cache(cache))
            }
        })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" | "keywords_ai" | "openai_compatible" => Ok(Provider::OpenAI),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}
