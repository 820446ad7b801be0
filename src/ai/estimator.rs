//! Estimator Client
//!
//! One logical estimate per task: prompt, provider call with bounded
//! exponential backoff on transient failures, normalization, and fallback on
//! every non-validation failure.
//!
//! ## Implementations
//!
//! - [`LiveEstimator`]: calls the configured provider
//! - [`FallbackEstimator`]: no credential; always answers with fallback content
//!
//! [`EstimatorClient::from_config`] picks one at construction and never
//! switches afterwards.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::fallback::fallback_estimate;
use super::metrics::SharedMetrics;
use super::normalizer::parse_estimate;
use super::prompt::build_estimate_prompt;
use super::provider::{GenerationParams, ProviderConfig, SharedProvider, create_provider};
use crate::config::{Config, RetryConfig};
use crate::constants::{provider, retry};
use crate::types::{EstimateError, EstimateResult, ProviderError, truncate_chars};

// =============================================================================
// Retry Policy
// =============================================================================

/// Backoff schedule for transient provider failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied to each further delay
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            factor: retry::BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// backon counts retries, not attempts; no jitter
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(Duration::from_secs(retry::MAX_DELAY_SECS))
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

// =============================================================================
// Estimator Trait
// =============================================================================

/// Produces an estimate for an already validated task
#[async_trait]
pub trait Estimator: Send + Sync {
    /// Never fails: any provider or parse failure yields fallback content
    async fn estimate(&self, task: &str) -> EstimateResult;

    /// Implementation name for logging
    fn name(&self) -> &str;

    /// Whether estimates can come from the live model
    fn is_available(&self) -> bool;
}

/// Shared estimator type
pub type SharedEstimator = Arc<dyn Estimator>;

// =============================================================================
// Live Estimator
// =============================================================================

/// Estimator backed by an LLM provider
pub struct LiveEstimator {
    provider: SharedProvider,
    params: GenerationParams,
    policy: RetryPolicy,
    /// Bound on the whole retry loop, sleeps included
    deadline: Duration,
    metrics: SharedMetrics,
}

impl LiveEstimator {
    pub fn new(
        provider: SharedProvider,
        params: GenerationParams,
        policy: RetryPolicy,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            provider,
            params,
            policy,
            deadline: Duration::from_secs(provider::ESTIMATE_DEADLINE_SECS),
            metrics,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Call the provider, retrying transient failures on the backoff schedule
    async fn call_with_retry(&self, prompt: &str) -> Result<String, ProviderError> {
        let attempt = std::sync::atomic::AtomicUsize::new(0);

        (|| async {
            let n = attempt.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
            self.metrics.record_attempt();
            debug!("Provider attempt {}/{}", n, self.policy.max_attempts);
            self.provider.generate(prompt, &self.params).await
        })
        .retry(self.policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &ProviderError| e.is_transient())
        .notify(|e: &ProviderError, dur: Duration| {
            self.metrics.record_retry();
            warn!("Transient provider failure, retrying in {:?}: {}", dur, e);
        })
        .await
    }

    /// Live path; every error here ends in fallback content
    async fn try_estimate(&self, task: &str) -> Result<EstimateResult, EstimateError> {
        let prompt = build_estimate_prompt(task);

        let raw = tokio::time::timeout(self.deadline, self.call_with_retry(&prompt))
            .await
            .map_err(|_| EstimateError::DeadlineExceeded(self.deadline))??;
        debug!("Raw model reply: {}...", truncate_chars(&raw, 200));

        parse_estimate(&raw, task).inspect_err(|_| self.metrics.record_parse_failure())
    }
}

#[async_trait]
impl Estimator for LiveEstimator {
    #[instrument(skip_all, fields(provider = self.provider.name(), model = self.provider.model()))]
    async fn estimate(&self, task: &str) -> EstimateResult {
        let start = Instant::now();

        match self.try_estimate(task).await {
            Ok(result) => {
                self.metrics
                    .record_success(start.elapsed().as_millis() as u64);
                info!("Estimate ready: {}", result.title);
                result
            }
            Err(e) => {
                warn!("Estimate failed, using fallback: {}", e);
                self.metrics.record_fallback();
                fallback_estimate(task, Some(&e.to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    fn is_available(&self) -> bool {
        true
    }
}

// =============================================================================
// Fallback Estimator
// =============================================================================

/// Estimator used when no credential is configured
pub struct FallbackEstimator {
    metrics: SharedMetrics,
}

impl FallbackEstimator {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Estimator for FallbackEstimator {
    async fn estimate(&self, task: &str) -> EstimateResult {
        self.metrics.record_fallback();
        fallback_estimate(task, Some(&EstimateError::ProviderUnavailable.to_string()))
    }

    fn name(&self) -> &str {
        "fallback"
    }

    fn is_available(&self) -> bool {
        false
    }
}

// =============================================================================
// Client
// =============================================================================

/// Validating front of the estimate pipeline
#[derive(Clone)]
pub struct EstimatorClient {
    inner: SharedEstimator,
    metrics: SharedMetrics,
}

impl EstimatorClient {
    pub fn new(inner: SharedEstimator, metrics: SharedMetrics) -> Self {
        Self { inner, metrics }
    }

    /// Decide availability once from configuration
    pub fn from_config(config: &Config, metrics: SharedMetrics) -> Self {
        if !config.llm.has_api_key() {
            warn!(
                "{} not configured, estimates will use fallback content",
                provider::API_KEY_ENV
            );
            return Self::unavailable(metrics);
        }

        match create_provider(&ProviderConfig::from(&config.llm)) {
            Ok(provider) => {
                info!(
                    "Estimator initialized with {} model: {}",
                    provider.name(),
                    provider.model()
                );
                let live = LiveEstimator::new(
                    provider,
                    GenerationParams::from(&config.llm),
                    RetryPolicy::from(&config.retry),
                    metrics.clone(),
                )
                .with_deadline(Duration::from_secs(config.llm.deadline_secs));
                Self::new(Arc::new(live), metrics)
            }
            Err(e) => {
                warn!("Failed to initialize provider, using fallback: {}", e);
                Self::unavailable(metrics)
            }
        }
    }

    /// Client that always answers with fallback content
    pub fn unavailable(metrics: SharedMetrics) -> Self {
        Self::new(Arc::new(FallbackEstimator::new(metrics.clone())), metrics)
    }

    /// Estimate a task. Only an empty task is rejected.
    pub async fn estimate(&self, task: &str) -> Result<EstimateResult, EstimateError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(EstimateError::Validation);
        }

        self.metrics.record_request();
        Ok(self.inner.estimate(task).await)
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::metrics::create_shared_metrics;
    use crate::ai::provider::LlmProvider;
    use crate::types::{ErrorCategory, Level};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const GOOD_REPLY: &str = r#"```json
{"title":"Add OAuth login flow","estimated_time":"3 days","priority":"High","complexity_level":"Medium","dependencies":"Auth service","required_access":["GitHub Repository Write Access"],"suggested_labels":["feature","auth"],"reasoning":"Phase 1: Technical Breakdown\nOverview: Use OAuth2.\n\nPhase 1: Setup\n- Register app\n\nPhase 2: Build\n- Implement callback\n\nPhase 3: Ship\n- Deploy"}
```"#;

    /// Provider answering from a fixed script
    pub(crate) struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::new(ErrorCategory::Unknown, "script exhausted")))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }

    fn overloaded() -> Result<String, ProviderError> {
        Err(ProviderError::new(
            ErrorCategory::Unavailable,
            "503 UNAVAILABLE: The model is overloaded.",
        ))
    }

    fn client_with(provider: Arc<ScriptedProvider>) -> EstimatorClient {
        let metrics = create_shared_metrics();
        let live = LiveEstimator::new(
            provider,
            GenerationParams::default(),
            RetryPolicy::default(),
            metrics.clone(),
        );
        EstimatorClient::new(Arc::new(live), metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_success() {
        let provider = ScriptedProvider::new(vec![
            overloaded(),
            overloaded(),
            Ok(GOOD_REPLY.to_string()),
        ]);
        let client = client_with(provider.clone());

        let start = tokio::time::Instant::now();
        let result = client.estimate("Add OAuth login").await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(6));
        assert_eq!(provider.calls(), 3);
        assert!(result.success);
        assert!(!result.fallback);
        assert_eq!(result.priority, Level::High);
        assert_eq!(result.dependencies, vec!["Auth service"]);

        let summary = client.metrics().summary();
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.retries, 2);
        assert_eq!(summary.successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_falls_back() {
        let provider = ScriptedProvider::new(vec![overloaded(), overloaded(), overloaded()]);
        let client = client_with(provider.clone());

        let result = client.estimate("Add OAuth login").await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert!(!result.success);
        assert!(result.fallback);
        assert!(result.error.unwrap().starts_with("API Error: 503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_falls_back_immediately() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::new(
            ErrorCategory::Auth,
            "API key not valid",
        ))]);
        let client = client_with(provider.clone());

        let start = tokio::time::Instant::now();
        let result = client.estimate("Add OAuth login").await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(provider.calls(), 1);
        assert!(result.fallback);
        assert_eq!(result.error.as_deref(), Some("API Error: API key not valid"));
    }

    /// Provider whose call never completes
    struct HangingProvider;

    #[async_trait]
    impl LlmProvider for HangingProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, ProviderError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }

        fn model(&self) -> &str {
            "hanging-model"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_ends_in_fallback() {
        let metrics = create_shared_metrics();
        let live = LiveEstimator::new(
            Arc::new(HangingProvider),
            GenerationParams::default(),
            RetryPolicy::default(),
            metrics.clone(),
        )
        .with_deadline(Duration::from_secs(5));
        let client = EstimatorClient::new(Arc::new(live), metrics);

        let start = tokio::time::Instant::now();
        let result = client.estimate("Add OAuth login").await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(6));
        assert!(!result.success);
        assert!(result.fallback);
        assert_eq!(
            result.error.as_deref(),
            Some("API Error: no response within 5s")
        );
        assert_eq!(client.metrics().summary().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_retried() {
        let provider = ScriptedProvider::new(vec![Ok("not json at all".to_string())]);
        let client = client_with(provider.clone());

        let result = client.estimate("Add OAuth login").await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert!(result.fallback);
        assert!(result.error.unwrap().starts_with("JSON Parse Error"));
        assert_eq!(client.metrics().summary().parse_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_task_rejected_before_provider() {
        let provider = ScriptedProvider::new(vec![Ok(GOOD_REPLY.to_string())]);
        let client = client_with(provider.clone());

        assert!(matches!(
            client.estimate("   \n ").await,
            Err(EstimateError::Validation)
        ));
        assert_eq!(provider.calls(), 0);
        assert_eq!(client.metrics().summary().requests, 0);
    }

    #[tokio::test]
    async fn test_unavailable_client_short_circuits() {
        let mut config = Config::default();
        config.llm.api_key = None;
        let client = EstimatorClient::from_config(&config, create_shared_metrics());

        assert!(!client.is_available());
        let result = client.estimate("Build a dashboard").await.unwrap();
        assert!(result.fallback);
        assert_eq!(
            result.error.as_deref(),
            Some("AI service temporarily unavailable")
        );
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            base_delay_ms: 10,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
    }
}
