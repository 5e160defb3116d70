use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
}

/// Model settings for one agent session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
    /// Base URL, with or without a trailing `/v1`.
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_model_id() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    2024
}

fn default_max_turns() -> u32 {
    20
}

impl ModelConfig {
    pub fn new(provider: LlmProvider, model_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: api_key.into(),
            api_base_url: None,
            temperature: None,
            max_tokens: default_max_tokens(),
            max_turns: default_max_turns(),
        }
    }

    /// API root without the version segment. A custom URL may be given
    /// with or without a trailing `/v1`.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            let url = url.trim_end_matches('/');
            url.strip_suffix("/v1").unwrap_or(url)
        } else {
            match self.provider {
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
            }
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: ModelConfig = serde_json::from_str(r#"{"api_base_url": null}"#).unwrap();
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert_eq!(config.model_id, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 2024);
        assert_eq!(config.max_turns, 20);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_provider_base_urls() {
        let mut config = ModelConfig::new(LlmProvider::Groq, "llama-3.3-70b", "key");
        assert_eq!(config.base_url(), "https://api.groq.com/openai");
        config.provider = LlmProvider::OpenRouter;
        assert_eq!(
            config.completions_url(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let mut config = ModelConfig::new(LlmProvider::OpenAi, "gpt-4o-mini", "key");
        config.api_base_url = Some("http://localhost:11434/".to_string());
        assert_eq!(
            config.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_custom_base_url_with_version_segment() {
        let mut config = ModelConfig::new(LlmProvider::OpenAi, "gpt-4o-mini", "key");
        config.api_base_url = Some("https://api.openai.com/v1".to_string());
        assert_eq!(config.base_url(), "https://api.openai.com");
        assert_eq!(
            config.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );

        config.api_base_url = Some("http://localhost:11434/v1/".to_string());
        assert_eq!(
            config.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );

        config.api_base_url = Some("https://gateway.example/v1beta".to_string());
        assert_eq!(
            config.completions_url(),
            "https://gateway.example/v1beta/v1/chat/completions"
        );
    }

    #[test]
    fn test_provider_lowercase() {
        let provider: LlmProvider = serde_json::from_str(r#""openrouter""#).unwrap();
        assert_eq!(provider, LlmProvider::OpenRouter);
    }
}
