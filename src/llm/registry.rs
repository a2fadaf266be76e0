//! Model registry: the two gateway handles the orchestrator uses

use super::{LlmError, LlmService, LoggingService, Provider, ProxyCacheOptions};
use std::sync::Arc;

/// Configuration for the LLM gateway
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Override for the provider endpoint (e.g. an OpenAI-compatible proxy)
    pub base_url: Option<String>,
    /// Model for capability work
    pub default_model: Option<String>,
    /// Model for classification and direct replies
    pub fast_model: Option<String>,
    /// Response caching, only sent by the chat-message adapter
    pub cache: Option<ProxyCacheOptions>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let provider = std::env::var("LLM_PROVIDER")
            .ok()
            .and_then(|p| match p.parse() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring LLM_PROVIDER");
                    None
                }
            })
            .unwrap_or_default();

        let cache_enabled = std::env::var("LLM_CACHE_ENABLED")
            .is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes"));
        let cache = cache_enabled.then(|| ProxyCacheOptions {
            ttl_secs: std::env::var("LLM_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
            by_customer: true,
        });

        Self {
            provider,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("LLM_BASE_URL").ok(),
            default_model: std::env::var("DEFAULT_MODEL").ok(),
            fast_model: std::env::var("FAST_MODEL").ok(),
            cache,
        }
    }

    fn api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }
}

/// Registry of gateway handles, built once at startup.
///
/// Both handles share one provider, so the wire protocol is fixed for the
/// lifetime of the process.
pub struct ModelRegistry {
    provider: Provider,
    default: Option<Arc<dyn LlmService>>,
    fast: Option<Arc<dyn LlmService>>,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    pub fn new_empty() -> Self {
        Self {
            provider: Provider::default(),
            default: None,
            fast: None,
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let provider = config.provider;
        let Some(api_key) = config.api_key().filter(|k| !k.is_empty()) else {
            return Self {
                provider,
                ..Self::new_empty()
            };
        };

        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        let fast_model = config
            .fast_model
            .clone()
            .unwrap_or_else(|| provider.fast_model().to_string());

        Self {
            provider,
            default: Self::try_create_model(config, api_key, &default_model),
            fast: Self::try_create_model(config, api_key, &fast_model),
        }
    }

    fn try_create_model(
        config: &LlmConfig,
        api_key: &str,
        model: &str,
    ) -> Option<Arc<dyn LlmService>> {
        match config
            .provider
            .build_service(api_key, model, config.base_url.as_deref(), config.cache)
        {
            Ok(service) => Some(Arc::new(LoggingService::new(service))),
            Err(e) => {
                tracing::error!(model = %model, error = %e, "Failed to create LLM service");
                None
            }
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.default.clone()
    }

    /// Get the fast model, falling back to the default model
    pub fn fast(&self) -> Option<Arc<dyn LlmService>> {
        self.fast.clone().or_else(|| self.default())
    }

    /// Default model, or an error suitable for surfacing at startup
    pub fn require_default(&self) -> Result<Arc<dyn LlmService>, LlmError> {
        self.default().ok_or_else(|| {
            LlmError::auth(format!(
                "No LLM configured. Set {}.",
                self.provider.api_key_env_var()
            ))
        })
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        self.default.is_some() || self.fast.is_some()
    }

    /// IDs of the configured models, default first
    pub fn available_models(&self) -> Vec<String> {
        [&self.default, &self.fast]
            .into_iter()
            .flatten()
            .map(|s| s.model_id().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_api_keys_no_models() {
        let registry = ModelRegistry::new(&LlmConfig::default());
        assert!(!registry.has_models());
        assert!(registry.available_models().is_empty());
        assert!(registry.require_default().is_err());
    }

    #[test]
    fn test_key_for_other_provider_is_ignored() {
        let config = LlmConfig {
            provider: Provider::Anthropic,
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(!ModelRegistry::new(&config).has_models());
    }

    #[test]
    fn test_default_model_selection() {
        let config = LlmConfig {
            anthropic_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);

        assert_eq!(
            registry.available_models(),
            vec![
                "claude-3-5-sonnet-20241022".to_string(),
                "claude-3-5-haiku-20241022".to_string()
            ]
        );
    }

    #[test]
    fn test_custom_models() {
        let config = LlmConfig {
            provider: Provider::OpenAI,
            openai_api_key: Some("sk-test".to_string()),
            default_model: Some("gpt-4.1".to_string()),
            fast_model: Some("gpt-4.1-mini".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);

        assert_eq!(registry.provider(), Provider::OpenAI);
        assert_eq!(registry.default().unwrap().model_id(), "gpt-4.1");
        assert_eq!(registry.fast().unwrap().model_id(), "gpt-4.1-mini");
    }
}
