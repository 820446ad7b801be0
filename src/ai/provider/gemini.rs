//! Gemini API Provider
//!
//! LLM provider using the Generative Language `generateContent` REST call.
//! Failures are classified from the HTTP status and the `error.status`
//! token of the response body.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{GenerationParams, LlmProvider, ProviderConfig};
use crate::types::{AppError, ErrorCategory, ErrorClassifier, ProviderError, Result};

const PROVIDER_NAME: &str = "gemini";

/// Gemini API Provider with secure API key handling
pub struct GeminiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "Gemini API key not found. Set GEMINI_API_KEY env var".to_string(),
                )
            })?;

        let api_base = Self::validate_endpoint(&config.api_base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model: config.model,
            client,
        })
    }

    /// Only allows http/https schemes; trailing slash removed
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            AppError::Config(format!("Invalid Gemini API base URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "Gemini API base must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if url.scheme() == "http" {
            warn!("Gemini API base is not using TLS: {}", endpoint);
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request<'a>(prompt: &'a str, params: &'a GenerationParams) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                max_output_tokens: params.max_output_tokens,
                response_mime_type: &params.response_mime_type,
            },
        }
    }

    /// Classify a non-success response from its status and body
    fn classify_error_body(status: u16, body: &str) -> ProviderError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let token = envelope.error.status.as_deref();
                let message = format!(
                    "{} {}: {}",
                    status,
                    token.unwrap_or("ERROR"),
                    envelope.error.message
                );
                ErrorClassifier::classify_http_status(status, token, &message, PROVIDER_NAME)
            }
            Err(_) => {
                let message = format!("{}: {}", status, body.trim());
                ErrorClassifier::classify_http_status(status, None, &message, PROVIDER_NAME)
            }
        }
    }

    /// Pull the first candidate's text out of a success body
    fn extract_text(body: GenerateResponse) -> std::result::Result<String, ProviderError> {
        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::new(
                ErrorCategory::BadRequest,
                format!("Prompt blocked: {}", reason),
            )
            .provider(PROVIDER_NAME));
        }

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::new(ErrorCategory::Unknown, "No content in Gemini response")
                    .provider(PROVIDER_NAME)
            })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> std::result::Result<String, ProviderError> {
        info!(
            "Generating with Gemini (model: {}, temperature: {})",
            self.model, params.temperature
        );

        let start_time = Instant::now();
        let request = Self::build_request(prompt, params);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::new(
                        ErrorCategory::Network,
                        format!("Gemini request failed: {}", e),
                    )
                    .provider(PROVIDER_NAME)
                } else {
                    ErrorClassifier::classify(
                        &format!("Gemini request failed: {}", e),
                        PROVIDER_NAME,
                    )
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Self::classify_error_body(status.as_u16(), &body);
            warn!("Gemini API error: {}", err);
            return Err(err);
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                ErrorCategory::Unknown,
                format!("Failed to decode Gemini response: {}", e),
            )
            .provider(PROVIDER_NAME)
        })?;

        debug!(
            "Received response from Gemini in {}ms",
            start_time.elapsed().as_millis()
        );

        Self::extract_text(body)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    fn provider_config() -> ProviderConfig {
        ProviderConfig {
            api_key: Some("test-key".to_string()),
            ..ProviderConfig::from(&LlmConfig::default())
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = ProviderConfig {
            api_key: None,
            ..provider_config()
        };
        assert!(matches!(
            GeminiProvider::new(config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(GeminiProvider::validate_endpoint("ftp://example.com").is_err());
        assert!(GeminiProvider::validate_endpoint("not a url").is_err());
        assert_eq!(
            GeminiProvider::validate_endpoint("http://localhost:8080/v1beta/").unwrap(),
            "http://localhost:8080/v1beta"
        );
    }

    #[test]
    fn test_endpoint_and_debug() {
        let provider = GeminiProvider::new(provider_config()).unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_request_body_shape() {
        let params = GenerationParams::default();
        let body = serde_json::to_value(GeminiProvider::build_request("Fix bug", &params)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "Fix bug");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_classify_error_body() {
        let overloaded = GeminiProvider::classify_error_body(
            503,
            r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#,
        );
        assert_eq!(overloaded.category, ErrorCategory::Unavailable);
        assert!(overloaded.message.contains("The model is overloaded."));

        let auth = GeminiProvider::classify_error_body(
            400,
            r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(auth.category, ErrorCategory::BadRequest);
        assert!(!auth.is_transient());

        let raw = GeminiProvider::classify_error_body(429, "Too Many Requests");
        assert_eq!(raw.category, ErrorCategory::RateLimit);
    }

    #[test]
    fn test_extract_text() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"title\":"},{"text":"\"x\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(GeminiProvider::extract_text(body).unwrap(), r#"{"title":"x"}"#);

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(GeminiProvider::extract_text(empty).is_err());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = GeminiProvider::extract_text(blocked).unwrap_err();
        assert_eq!(err.category, ErrorCategory::BadRequest);
    }
}
