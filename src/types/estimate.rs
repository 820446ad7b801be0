//! Estimate Types
//!
//! The estimate pipeline's output (`EstimateResult`) and the structured view
//! of its three-phase reasoning narrative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-step rating used for both priority and complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Level {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Low => write!(f, "Low"),
            Level::Medium => write!(f, "Medium"),
            Level::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            _ => Err(format!(
                "Unknown level: {}. Valid values: Low, Medium, High",
                s
            )),
        }
    }
}

impl Level {
    /// Lowercase form used by the ticket store
    pub fn as_storage_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

/// Structured effort estimate for one task description.
///
/// Array fields are always arrays; a failed estimate carries the fallback
/// content in every field plus `error` and `fallback = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub success: bool,
    pub title: String,
    pub estimated_time: String,
    pub priority: Level,
    pub complexity_level: Level,
    pub dependencies: Vec<String>,
    pub required_access: Vec<String>,
    pub suggested_labels: Vec<String>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EstimateResult {
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Structured view of `reasoning`, if it follows the three-phase layout
    pub fn parsed_reasoning(&self) -> Option<Reasoning> {
        Reasoning::parse(&self.reasoning)
    }
}

// =============================================================================
// Reasoning
// =============================================================================

/// One named milestone with its ordered action items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: String,
    pub tasks: Vec<String>,
}

/// Overview plus exactly three phases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reasoning {
    pub overview: String,
    pub phases: Vec<Phase>,
}

impl Reasoning {
    pub const PHASE_COUNT: usize = 3;

    /// Parse the narrative layout:
    ///
    /// ```text
    /// Phase 1: Technical Breakdown
    /// Overview: ...
    ///
    /// Phase 1: <name>
    /// - <task>
    /// ...
    /// ```
    ///
    /// Returns `None` unless exactly three phases with at least one task each
    /// are found.
    pub fn parse(text: &str) -> Option<Self> {
        let mut overview = Vec::new();
        let mut phases: Vec<Phase> = Vec::new();
        let mut in_overview = false;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(rest) = line.strip_prefix("Overview:") {
                in_overview = true;
                overview.push(rest.trim().to_string());
                continue;
            }

            if let Some(name) = phase_label(line) {
                in_overview = false;
                if name.eq_ignore_ascii_case("Technical Breakdown") && phases.is_empty() {
                    continue;
                }
                phases.push(Phase {
                    name: name.to_string(),
                    tasks: Vec::new(),
                });
                continue;
            }

            if let Some(task) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
                if let Some(phase) = phases.last_mut() {
                    phase.tasks.push(task.trim().to_string());
                }
                continue;
            }

            if in_overview {
                overview.push(line.to_string());
            }
        }

        let complete = phases.len() == Self::PHASE_COUNT && phases.iter().all(|p| !p.tasks.is_empty());
        if !complete {
            return None;
        }

        Some(Self {
            overview: overview.join(" "),
            phases,
        })
    }
}

/// `Phase N: <name>` → `<name>`
fn phase_label(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("Phase ")?;
    let (number, name) = rest.split_once(':')?;
    if number.trim().chars().all(|c| c.is_ascii_digit()) && !number.trim().is_empty() {
        Some(name.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NARRATIVE: &str = "Phase 1: Technical Breakdown
Overview: Build a REST endpoint. Use the existing auth layer.

Phase 1: Setup
- Create module
- Add config

Phase 2: Implementation
- Write handler

Phase 3: Release
- Deploy
- Monitor";

    #[test]
    fn test_level_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Level>().unwrap(), Level::High);
        assert_eq!(" low ".parse::<Level>().unwrap(), Level::Low);
        assert!("urgent".parse::<Level>().is_err());
        assert_eq!(Level::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_level_deserializes_lowercase() {
        let level: Level = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(level, Level::High);
        assert_eq!(serde_json::to_string(&level).unwrap(), "\"High\"");
    }

    #[test]
    fn test_reasoning_parse() {
        let reasoning = Reasoning::parse(NARRATIVE).unwrap();
        assert_eq!(
            reasoning.overview,
            "Build a REST endpoint. Use the existing auth layer."
        );
        assert_eq!(reasoning.phases.len(), 3);
        assert_eq!(reasoning.phases[0].name, "Setup");
        assert_eq!(reasoning.phases[0].tasks, vec!["Create module", "Add config"]);
        assert_eq!(reasoning.phases[2].tasks.len(), 2);
    }

    #[test]
    fn test_reasoning_parse_rejects_free_text() {
        assert!(Reasoning::parse("Basic implementation").is_none());
    }

    #[test]
    fn test_reasoning_parse_rejects_missing_phase() {
        let two_phases = NARRATIVE.split("Phase 3").next().unwrap();
        assert!(Reasoning::parse(two_phases).is_none());
    }

    #[test]
    fn test_estimate_result_serializes_without_empty_optionals() {
        let result = EstimateResult {
            success: true,
            title: "Add login page".to_string(),
            estimated_time: "2 days".to_string(),
            priority: Level::High,
            complexity_level: Level::Low,
            dependencies: vec![],
            required_access: vec!["GitHub Repository Write Access".to_string()],
            suggested_labels: vec!["feature".to_string()],
            reasoning: String::new(),
            error: None,
            fallback: false,
            timestamp: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["priority"], "High");
        assert!(json.get("error").is_none());
        assert!(json.get("timestamp").is_none());
        assert_eq!(json["fallback"], false);
    }
}
