//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/kanban-estimator/) and project (.kanban/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{generation, provider, retry, server, storage};
use crate::types::{AppError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// HTTP server settings
    pub server: ServerConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Estimate retry settings
    pub retry: RetryConfig,

    /// Ticket store settings
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `AppError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(AppError::Config(format!(
                "LLM top_p must be between 0.0 and 1.0, got {}",
                self.llm.top_p
            )));
        }

        if self.llm.top_k == 0 || self.llm.max_output_tokens == 0 {
            return Err(AppError::Config(
                "LLM top_k and max_output_tokens must be greater than 0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.llm.deadline_secs == 0 {
            return Err(AppError::Config(
                "LLM timeout_secs and deadline_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "Retry max_attempts must be at least 1".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "Server request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        // A slow provider must end in fallback content before the request is cut
        if self.server.request_timeout_secs <= self.llm.deadline_secs {
            return Err(AppError::Config(format!(
                "Server request_timeout_secs ({}) must exceed LLM deadline_secs ({})",
                self.server.request_timeout_secs, self.llm.deadline_secs
            )));
        }

        if self.server.max_body_bytes == 0 {
            return Err(AppError::Config(
                "Server max_body_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            cors_origins: Vec::new(),
            request_timeout_secs: server::REQUEST_TIMEOUT_SECS,
            max_body_bytes: server::MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// LLM provider settings
///
/// The API key is never serialized and is redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,

    /// Provider credential; absent means the estimator runs in fallback-only mode
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL
    pub api_base: String,

    /// Request timeout per attempt in seconds
    pub timeout_secs: u64,

    /// Deadline for a whole estimate, retries included, in seconds
    pub deadline_secs: u64,

    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("deadline_secs", &self.deadline_secs)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: provider::DEFAULT_PROVIDER.to_string(),
            model: provider::DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: provider::DEFAULT_API_BASE.to_string(),
            timeout_secs: provider::DEFAULT_TIMEOUT_SECS,
            deadline_secs: provider::ESTIMATE_DEADLINE_SECS,
            temperature: generation::TEMPERATURE,
            top_p: generation::TOP_P,
            top_k: generation::TOP_K,
            max_output_tokens: generation::MAX_OUTPUT_TOKENS,
        }
    }
}

impl LlmConfig {
    /// Whether a non-blank credential is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total provider attempts, including the first call
    pub max_attempts: usize,

    /// First backoff delay; each further delay doubles
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            base_delay_ms: retry::BASE_DELAY_MS,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(storage::DEFAULT_DATABASE_PATH),
        }
    }
}
