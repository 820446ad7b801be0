//! Response Normalizer
//!
//! Turns the raw model reply into an [`EstimateResult`]:
//! 1. strip a fenced code block wrapper
//! 2. strict JSON parse; the top level must be an object
//! 3. wrap bare strings in the list-valued fields into one-element arrays
//! 4. deserialize into [`RawEstimate`] and apply defaults
//!
//! Step 3 is the only place string-or-array coercion happens.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::tracker::derive_title;
use crate::types::{EstimateError, EstimateResult, Level};

/// Fields that must always be arrays
pub const LIST_FIELDS: [&str; 3] = ["required_access", "dependencies", "suggested_labels"];

const DEFAULT_ESTIMATED_TIME: &str = "Unknown";

/// Strip a leading ```` ```json ```` / ```` ``` ```` fence and a trailing ```` ``` ````.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim().trim_start_matches('\u{feff}').trim();

    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }

    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }

    s.trim()
}

/// Parse the reply into a JSON object with list fields coerced to arrays.
pub fn normalize_response(raw: &str) -> Result<Value, EstimateError> {
    let cleaned = strip_code_fences(raw);

    let mut value: Value = serde_json::from_str(cleaned).map_err(|e| {
        debug!(
            "Unparseable model reply: {}...",
            cleaned.chars().take(200).collect::<String>()
        );
        EstimateError::Parse(e.to_string())
    })?;

    let object = value.as_object_mut().ok_or_else(|| {
        EstimateError::Parse(format!("expected a JSON object, got {}", kind_of(cleaned)))
    })?;

    for field in LIST_FIELDS {
        if let Some(Value::String(s)) = object.get(field) {
            let wrapped = Value::Array(vec![Value::String(s.clone())]);
            object.insert(field.to_string(), wrapped);
        }
    }

    Ok(value)
}

fn kind_of(cleaned: &str) -> &'static str {
    match cleaned.chars().next() {
        Some('[') => "an array",
        Some('"') => "a string",
        Some('t' | 'f') => "a boolean",
        Some('n') => "null",
        _ => "a number",
    }
}

/// Loosely-typed estimate as the model returns it
#[derive(Debug, Default, Deserialize)]
pub struct RawEstimate {
    pub title: Option<String>,
    pub estimated_time: Option<String>,
    pub priority: Option<String>,
    pub complexity_level: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub required_access: Option<Vec<String>>,
    pub suggested_labels: Option<Vec<String>>,
    pub reasoning: Option<String>,
}

/// Convert a normalized object into a successful [`EstimateResult`].
pub fn into_estimate(value: Value, task: &str) -> Result<EstimateResult, EstimateError> {
    let raw: RawEstimate =
        serde_json::from_value(value).map_err(|e| EstimateError::Parse(e.to_string()))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| derive_title(task));

    let estimated_time = raw
        .estimated_time
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_ESTIMATED_TIME.to_string());

    Ok(EstimateResult {
        success: true,
        title,
        estimated_time,
        priority: parse_level(raw.priority.as_deref(), "priority"),
        complexity_level: parse_level(raw.complexity_level.as_deref(), "complexity_level"),
        dependencies: raw.dependencies.unwrap_or_default(),
        required_access: raw.required_access.unwrap_or_default(),
        suggested_labels: raw.suggested_labels.unwrap_or_default(),
        reasoning: raw.reasoning.unwrap_or_default(),
        error: None,
        fallback: false,
        timestamp: None,
    })
}

/// Full pipeline: raw reply text to estimate
pub fn parse_estimate(raw: &str, task: &str) -> Result<EstimateResult, EstimateError> {
    into_estimate(normalize_response(raw)?, task)
}

fn parse_level(value: Option<&str>, field: &str) -> Level {
    match value {
        None => Level::default(),
        Some(s) => s.parse().unwrap_or_else(|e| {
            warn!("Invalid {} from model, using Medium: {}", field, e);
            Level::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const PAYLOAD: &str = r#"{"title":"Add login page","estimated_time":"3 days","priority":"high","complexity_level":"Low","dependencies":["Auth API"],"required_access":"Backend","suggested_labels":["feature"],"reasoning":"Phase 1: Technical Breakdown"}"#;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_fenced_matches_bare() {
        let fenced = format!("```json\n{}\n```", PAYLOAD);
        assert_eq!(
            normalize_response(&fenced).unwrap(),
            normalize_response(PAYLOAD).unwrap()
        );
    }

    #[test]
    fn test_string_list_field_is_wrapped() {
        let value = normalize_response(PAYLOAD).unwrap();
        assert_eq!(value["required_access"], json!(["Backend"]));
        assert_eq!(value["dependencies"], json!(["Auth API"]));
    }

    #[test]
    fn test_absent_list_field_stays_absent() {
        let value = normalize_response(r#"{"title":"x"}"#).unwrap();
        assert!(value.get("dependencies").is_none());
    }

    #[test]
    fn test_non_json_is_parse_error() {
        assert!(matches!(
            normalize_response("Sure! Here is your estimate."),
            Err(EstimateError::Parse(_))
        ));
    }

    #[test]
    fn test_non_object_is_parse_error() {
        let err = normalize_response("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_into_estimate_applies_defaults() {
        let result = parse_estimate("{}", "fix login bug on mobile Safari for iOS 17").unwrap();
        assert!(result.success);
        assert!(!result.fallback);
        assert_eq!(result.title, "Fix login bug on mobile Safari");
        assert_eq!(result.estimated_time, "Unknown");
        assert_eq!(result.priority, Level::Medium);
        assert!(result.dependencies.is_empty());
        assert!(result.required_access.is_empty());
        assert_eq!(result.reasoning, "");
    }

    #[test]
    fn test_into_estimate_parses_levels() {
        let result = parse_estimate(PAYLOAD, "Add login").unwrap();
        assert_eq!(result.priority, Level::High);
        assert_eq!(result.complexity_level, Level::Low);
        assert_eq!(result.required_access, vec!["Backend"]);
    }

    #[test]
    fn test_unknown_level_defaults_to_medium() {
        let result = parse_estimate(r#"{"priority":"Urgent"}"#, "task").unwrap();
        assert_eq!(result.priority, Level::Medium);
    }

    #[test]
    fn test_schema_violation_is_parse_error() {
        let err = parse_estimate(r#"{"dependencies":[1,2]}"#, "task").unwrap_err();
        assert!(matches!(err, EstimateError::Parse(_)));
    }

    proptest! {
        #[test]
        fn prop_list_fields_always_arrays(access in "[A-Za-z ]{0,30}", wrap in any::<bool>()) {
            let value = if wrap {
                json!({"required_access": [access.clone()]})
            } else {
                json!({"required_access": access.clone()})
            };
            let normalized = normalize_response(&value.to_string()).unwrap();
            prop_assert_eq!(&normalized["required_access"], &json!([access]));
        }

        #[test]
        fn prop_fence_is_transparent(title in "[A-Za-z0-9 ]{0,40}") {
            let bare = json!({"title": title}).to_string();
            let fenced = format!("```json\n{}\n```", bare);
            prop_assert_eq!(normalize_response(&fenced).unwrap(), normalize_response(&bare).unwrap());
        }
    }
}
