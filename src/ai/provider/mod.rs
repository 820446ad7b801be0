//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait the estimator calls. A provider turns a
//! prompt plus generation parameters into raw response text, or a classified
//! [`ProviderError`] the estimator uses for its retry decision.

mod gemini;

pub use gemini::GeminiProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, ProviderError};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{AppError, Result};

// =============================================================================
// Generation Parameters
// =============================================================================

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    /// Requested response MIME type (JSON mode)
    pub response_mime_type: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for GenerationParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: crate::constants::generation::RESPONSE_MIME_TYPE.to_string(),
        }
    }
}

/// Shared LLM provider type for concurrent access across requests.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// Note: the API key is redacted in debug output and converted to a
/// SecretString by the provider.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider type: "gemini"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub api_key: Option<String>,
    /// API base URL
    pub api_base: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl From<&LlmConfig> for ProviderConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM provider producing raw response text
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Issue one generation request
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> std::result::Result<String, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        _ => Err(AppError::Config(format!(
            "Unknown provider: {}. Supported: gemini",
            config.provider
        ))),
    }
}
