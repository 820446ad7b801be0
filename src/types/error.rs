//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for the estimator's retry decisions.
//!
//! ## Error Categories
//!
//! - **RateLimit**: API rate limiting (retry with backoff)
//! - **Unavailable**: Provider overloaded or down (retry with backoff)
//! - **Auth**: Authentication failures (fail fast)
//! - **BadRequest**: Invalid request (fail fast)
//! - **Network**: Connectivity issues (fail fast, the provider never saw the call)
//!
//! ## Layers
//!
//! - [`ProviderError`]: a classified failure from the external model API
//! - [`EstimateError`]: the estimate pipeline taxonomy; only `Validation`
//!   ever reaches callers, every other variant ends in a fallback estimate
//! - [`AppError`]: crate-wide error for storage, config and tracker operations

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Provider failure categories driving the retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// HTTP 429 or quota exhaustion
    RateLimit,
    /// HTTP 503 or an `UNAVAILABLE` status token
    Unavailable,
    /// Credential rejected
    Auth,
    /// Request rejected as malformed
    BadRequest,
    /// Transport failure before a response was received
    Network,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether the estimator retries this category with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Unavailable)
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Classified failure from an LLM provider
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// HTTP status, when the provider answered
    pub status: Option<u16>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            status: None,
        }
    }

    /// Add provider context to existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attach the HTTP status the provider answered with
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.category.is_transient()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

static TRANSIENT_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(429|503)\b").expect("static status pattern"));

/// Maps provider failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message by its signature.
    ///
    /// Transient signatures are the `503`/`429` status codes and the
    /// `UNAVAILABLE` status token.
    pub fn classify(message: &str, provider: &str) -> ProviderError {
        let category = if let Some(code) = TRANSIENT_STATUS.captures(message) {
            if &code[1] == "429" {
                ErrorCategory::RateLimit
            } else {
                ErrorCategory::Unavailable
            }
        } else if message.contains("UNAVAILABLE") {
            ErrorCategory::Unavailable
        } else {
            let lower = message.to_lowercase();
            if lower.contains("rate limit") || lower.contains("resource_exhausted") {
                ErrorCategory::RateLimit
            } else if lower.contains("401")
                || lower.contains("403")
                || lower.contains("api key")
                || lower.contains("unauthenticated")
                || lower.contains("permission_denied")
            {
                ErrorCategory::Auth
            } else if lower.contains("400") || lower.contains("invalid_argument") {
                ErrorCategory::BadRequest
            } else if lower.contains("connection")
                || lower.contains("timed out")
                || lower.contains("dns")
            {
                ErrorCategory::Network
            } else {
                ErrorCategory::Unknown
            }
        };

        ProviderError::new(category, message).provider(provider)
    }

    /// Classify an HTTP failure using the status code and the API's status token
    pub fn classify_http_status(
        status: u16,
        status_token: Option<&str>,
        message: &str,
        provider: &str,
    ) -> ProviderError {
        let category = match (status, status_token) {
            (429, _) => ErrorCategory::RateLimit,
            (503, _) | (_, Some("UNAVAILABLE")) => ErrorCategory::Unavailable,
            (401 | 403, _) => ErrorCategory::Auth,
            (400 | 404, _) => ErrorCategory::BadRequest,
            _ => ErrorCategory::Unknown,
        };

        ProviderError::new(category, message)
            .provider(provider)
            .status(status)
    }
}

// =============================================================================
// Estimate Pipeline Error
// =============================================================================

/// Failure taxonomy of the estimate pipeline.
///
/// Display strings double as the `error` note of fallback estimates.
#[derive(Debug, Clone, Error)]
pub enum EstimateError {
    /// Empty or missing task text; rejected before any network call
    #[error("Task description is required")]
    Validation,

    /// No credential configured
    #[error("AI service temporarily unavailable")]
    ProviderUnavailable,

    /// Rate-limited or overloaded after all retries
    #[error("API Error: {}", .0.message)]
    TransientProvider(ProviderError),

    /// Any other provider failure
    #[error("API Error: {}", .0.message)]
    PermanentProvider(ProviderError),

    /// No usable reply before the estimate deadline
    #[error("API Error: no response within {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Non-JSON or schema-violating model response
    #[error("JSON Parse Error: {0}")]
    Parse(String),
}

impl From<ProviderError> for EstimateError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            EstimateError::TransientProvider(err)
        } else {
            EstimateError::PermanentProvider(err)
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Estimate(#[from] EstimateError),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status '{0}'. Valid values: new, in_progress, review, completed, blocked")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| AppError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| AppError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Unavailable.to_string(), "UNAVAILABLE");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_transient_categories() {
        assert!(ErrorCategory::RateLimit.is_transient());
        assert!(ErrorCategory::Unavailable.is_transient());
        assert!(!ErrorCategory::Auth.is_transient());
        assert!(!ErrorCategory::BadRequest.is_transient());
        assert!(!ErrorCategory::Network.is_transient());
        assert!(!ErrorCategory::Unknown.is_transient());
    }

    #[test]
    fn test_classify_transient_signatures() {
        let overloaded = ErrorClassifier::classify("503 The model is overloaded", "gemini");
        assert_eq!(overloaded.category, ErrorCategory::Unavailable);

        let token = ErrorClassifier::classify("status: UNAVAILABLE", "gemini");
        assert_eq!(token.category, ErrorCategory::Unavailable);

        let limited = ErrorClassifier::classify("429 Too Many Requests", "gemini");
        assert_eq!(limited.category, ErrorCategory::RateLimit);
        assert!(limited.is_transient());
    }

    #[test]
    fn test_classify_ignores_embedded_digits() {
        let err = ErrorClassifier::classify("prompt has 15034 tokens", "gemini");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_permanent() {
        let auth = ErrorClassifier::classify("API key not valid", "gemini");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let weird = ErrorClassifier::classify("Something weird happened", "gemini");
        assert_eq!(weird.category, ErrorCategory::Unknown);
        assert!(!weird.is_transient());
    }

    #[test]
    fn test_classify_http_status() {
        let limited = ErrorClassifier::classify_http_status(429, None, "quota", "gemini");
        assert_eq!(limited.category, ErrorCategory::RateLimit);
        assert_eq!(limited.status, Some(429));

        let by_token =
            ErrorClassifier::classify_http_status(500, Some("UNAVAILABLE"), "busy", "gemini");
        assert_eq!(by_token.category, ErrorCategory::Unavailable);

        let server = ErrorClassifier::classify_http_status(500, Some("INTERNAL"), "boom", "gemini");
        assert_eq!(server.category, ErrorCategory::Unknown);

        let auth = ErrorClassifier::classify_http_status(403, None, "denied", "gemini");
        assert_eq!(auth.category, ErrorCategory::Auth);
    }

    #[test]
    fn test_estimate_error_from_provider_error() {
        let transient: EstimateError =
            ProviderError::new(ErrorCategory::Unavailable, "overloaded").into();
        assert!(matches!(transient, EstimateError::TransientProvider(_)));
        assert_eq!(transient.to_string(), "API Error: overloaded");

        let permanent: EstimateError = ProviderError::new(ErrorCategory::Auth, "bad key").into();
        assert!(matches!(permanent, EstimateError::PermanentProvider(_)));
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ErrorCategory::RateLimit, "Too many requests").provider("gemini");
        assert_eq!(err.to_string(), "[gemini:RATE_LIMIT] Too many requests");

        let bare = ProviderError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(bare.to_string(), "[NETWORK] Connection failed");
    }
}
