//! AI Integration Layer
//!
//! Turns a free-text task description into a structured [`EstimateResult`]
//! via an LLM provider, with retry, normalization and a canned fallback.
//!
//! [`EstimateResult`]: crate::types::EstimateResult

pub mod estimator;
pub mod fallback;
pub mod metrics;
pub mod normalizer;
pub mod prompt;
pub mod provider;

pub use estimator::{
    Estimator, EstimatorClient, FallbackEstimator, LiveEstimator, RetryPolicy, SharedEstimator,
};
pub use fallback::fallback_estimate;
pub use metrics::{EstimateMetrics, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use normalizer::{normalize_response, parse_estimate, strip_code_fences};
pub use prompt::{PromptBuilder, PromptSection, build_estimate_prompt};
pub use provider::{
    GeminiProvider, GenerationParams, LlmProvider, ProviderConfig, SharedProvider,
    create_provider,
};
