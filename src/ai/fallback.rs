//! Fallback Generator
//!
//! Deterministic, schema-valid estimate used whenever the live path cannot
//! produce one. Identical inputs give identical output apart from `timestamp`.

use chrono::Utc;
use tracing::warn;

use crate::constants::fallback;
use crate::types::{EstimateResult, Level, truncate_chars};

/// Build the fallback estimate for `task`.
///
/// `error` becomes the result's error note; `None` uses the generic
/// unavailability message.
pub fn fallback_estimate(task: &str, error: Option<&str>) -> EstimateResult {
    warn!(
        "Using fallback response for: {}...",
        truncate_chars(task, 50)
    );

    EstimateResult {
        success: false,
        title: format!(
            "Analysis: {}...",
            truncate_chars(task, fallback::TITLE_TASK_CHARS)
        ),
        estimated_time: "1-2 weeks".to_string(),
        priority: Level::Medium,
        complexity_level: Level::Medium,
        dependencies: to_strings(&["Initial requirements gathering", "Technical review"]),
        required_access: to_strings(&[
            "Development Environment Access",
            "Version Control System (GitHub/GitLab)",
            "Testing Environment",
        ]),
        suggested_labels: to_strings(&["feature", "development", "needs-review"]),
        reasoning: fallback_reasoning(task),
        error: Some(error.unwrap_or(fallback::DEFAULT_ERROR).to_string()),
        fallback: true,
        timestamp: Some(Utc::now()),
    }
}

fn fallback_reasoning(task: &str) -> String {
    format!(
        "Phase 1: Technical Breakdown
Overview: Manual technical analysis required for '{}...'. Standard development workflow with modern tech stack. Requires environment setup, implementation, and deployment phases.

Phase 1: Requirements Analysis and Setup
- Review task requirements and define scope
- Set up development environment and tools
- Create project structure and initial configuration

Phase 2: Core Implementation
- Implement main functionality according to specifications
- Write comprehensive unit and integration tests
- Conduct code review and refactoring

Phase 3: Testing and Deployment
- Perform end-to-end testing in staging environment
- Create deployment documentation and runbooks
- Deploy to production with monitoring setup",
        truncate_chars(task, fallback::REASONING_TASK_CHARS)
    )
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_complete() {
        let result = fallback_estimate("Build a reporting dashboard", None);

        assert!(!result.success);
        assert!(result.is_fallback());
        assert_eq!(result.error.as_deref(), Some("AI service temporarily unavailable"));
        assert_eq!(result.title, "Analysis: Build a reporting dashboard...");
        assert_eq!(result.estimated_time, "1-2 weeks");
        assert_eq!(result.dependencies.len(), 2);
        assert_eq!(result.required_access.len(), 3);
        assert_eq!(result.suggested_labels, vec!["feature", "development", "needs-review"]);
        assert!(result.timestamp.is_some());
    }

    #[test]
    fn test_fallback_reasoning_has_three_phases() {
        let result = fallback_estimate("Build a reporting dashboard", None);
        let reasoning = result.parsed_reasoning().unwrap();

        assert_eq!(reasoning.phases.len(), 3);
        assert_eq!(reasoning.phases[0].name, "Requirements Analysis and Setup");
        assert!(reasoning.overview.contains("Build a reporting dashboard"));
    }

    #[test]
    fn test_fallback_truncates_task() {
        let task = "x".repeat(150);
        let result = fallback_estimate(&task, Some("API Error: boom"));

        assert_eq!(result.title, format!("Analysis: {}...", "x".repeat(40)));
        assert!(result.reasoning.contains(&format!("'{}...'", "x".repeat(100))));
        assert!(!result.reasoning.contains(&"x".repeat(101)));
        assert_eq!(result.error.as_deref(), Some("API Error: boom"));
    }

    #[test]
    fn test_fallback_is_deterministic_apart_from_timestamp() {
        let mut a = fallback_estimate("Same task", Some("note"));
        let mut b = fallback_estimate("Same task", Some("note"));
        a.timestamp = None;
        b.timestamp = None;

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
