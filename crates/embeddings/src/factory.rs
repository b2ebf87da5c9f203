use crate::error::{EmbeddingError, Result};
use crate::local::LocalProvider;
use crate::provider::EmbeddingProvider;
use crate::remote::{HuggingFaceProvider, OpenAiProvider};
use crate::stub::StubProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Local,
    OpenAi,
    HuggingFace,
    Stub,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
            Self::HuggingFace => "huggingface",
            Self::Stub => "stub",
        }
    }
}

/// Settings needed to construct an embedding provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Backend to use
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model identifier understood by the backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key for remote backends
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL override for OpenAI-compatible endpoints
    #[serde(default)]
    pub base_url: String,

    /// Vector dimension; remote backends cannot discover it
    #[serde(default)]
    pub dimension: Option<usize>,
}

fn default_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_api_key_env() -> String {
    "CTXAI_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: String::new(),
            dimension: None,
        }
    }
}

impl ProviderConfig {
    fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            EmbeddingError::invalid_config(format!(
                "API key environment variable {} is not set",
                self.api_key_env
            ))
        })
    }
}

/// Construct the provider named by the configuration
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Local => Ok(Arc::new(LocalProvider::new(&config.model)?)),
        ProviderKind::OpenAi => {
            let dimension = config.dimension.unwrap_or(1536);
            Ok(Arc::new(OpenAiProvider::new(
                &config.api_key()?,
                &config.base_url,
                &config.model,
                dimension,
            )?))
        }
        ProviderKind::HuggingFace => {
            let dimension = config.dimension.unwrap_or(384);
            Ok(Arc::new(HuggingFaceProvider::new(
                &config.api_key()?,
                &config.model,
                dimension,
            )?))
        }
        ProviderKind::Stub => Ok(Arc::new(StubProvider::new(
            config.dimension.unwrap_or(384),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_targets_local_model() {
        let config = ProviderConfig::default();
        assert_eq!(config.provider, ProviderKind::Local);
        assert_eq!(config.model, "all-MiniLM-L6-v2");
    }

    #[test]
    fn stub_provider_needs_no_credentials() {
        let config = ProviderConfig {
            provider: ProviderKind::Stub,
            dimension: Some(32),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dimension(), 32);
        assert_eq!(provider.model_id(), "stub");
    }

    #[test]
    fn remote_provider_without_key_fails() {
        let config = ProviderConfig {
            provider: ProviderKind::OpenAi,
            api_key_env: "CTXAI_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
            ..Default::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn provider_kind_roundtrips_through_serde() {
        let json = serde_json::to_string(&ProviderKind::HuggingFace).unwrap();
        assert_eq!(json, "\"huggingface\"");
        let back: ProviderKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProviderKind::HuggingFace);
    }
}
