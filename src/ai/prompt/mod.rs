//! Prompt Builder System
//!
//! Standardized prompt construction for the estimate call.
//!
//! ## Estimate Prompt Layout
//!
//! 1. **Role**: Kanban project management assistant
//! 2. **Task**: the verbatim task description
//! 3. **Output Schema**: exact JSON shape with per-field format hints
//! 4. **Reasoning Template**: overview plus exactly three phases
//! 5. **Focus**: access-requirement rules

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language
    Code { language: String, content: String },
    /// Focus enforcement with restrictions
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add code block
    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add focus enforcement section
    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are a {} specialized in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("IMPORTANT for {}:\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

// =============================================================================
// Estimate Prompt
// =============================================================================

const OUTPUT_SCHEMA: &str = r#"{
    "title": "Short action-based title (3-6 words, start with verb like Fix, Add, Update, Create)",
    "estimated_time": "string (e.g., '2 days', '1 week', '3 weeks')",
    "priority": "string (Low/Medium/High)",
    "complexity_level": "string (Low/Medium/High)",
    "dependencies": ["array of prerequisite tasks or systems"],
    "required_access": [
        "Specific access requirement 1 (e.g., 'GitHub Repository Write Access')",
        "Specific access requirement 2 (e.g., 'AWS Lambda Deployment Console')",
        "Specific access requirement 3 (e.g., 'PostgreSQL Database Admin Rights')"
    ],
    "suggested_labels": ["array", "of", "labels"],
    "reasoning": "MUST BE IN THIS EXACT FORMAT (see below)"
}"#;

const REASONING_TEMPLATE: &str = "Phase 1: Technical Breakdown
Overview: [Write 3-4 concise technical sentences describing the approach, architecture, or key technologies involved. Be specific about the technical stack and implementation strategy.]

Phase 1: [First milestone name]
- [Specific task 1]
- [Specific task 2]
- [Specific task 3]

Phase 2: [Second milestone name]
- [Specific task 1]
- [Specific task 2]
- [Specific task 3]

Phase 3: [Third milestone name]
- [Specific task 1]
- [Specific task 2]
- [Specific task 3]";

/// Render the estimate prompt for one task description.
///
/// The task text is embedded verbatim.
pub fn build_estimate_prompt(task: &str) -> String {
    PromptBuilder::new()
        .role(
            "software project management assistant",
            "Kanban-based workflows",
        )
        .text("Analyze the task below and return a STRICTLY VALID JSON response.")
        .section("TASK DESCRIPTION", task)
        .text("Return JSON in this EXACT format:")
        .code("json", OUTPUT_SCHEMA)
        .text("CRITICAL: The \"reasoning\" field MUST follow this EXACT structure:")
        .code("text", REASONING_TEMPLATE)
        .focus(
            "required_access",
            vec![
                "Be specific about exact access needed for THIS TASK",
                "Include service/tool name (GitHub, AWS, PostgreSQL, Slack, Telegram, etc.)",
                "Specify access type (Read, Write, Admin, Console, etc.)",
            ],
        )
        .objectives(vec![
            "Analyze the task and provide realistic, practical estimates",
            "Respond ONLY with the JSON object, no explanation",
        ])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("project assistant", "estimation")
            .objectives(vec!["Estimate effort", "List access"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("project assistant"));
        assert!(prompt.contains("1. Estimate effort"));
        assert!(prompt.contains("2. List access"));
    }

    #[test]
    fn test_focus_section() {
        let prompt = PromptBuilder::new()
            .focus("required_access", vec!["Be specific"])
            .build();

        assert!(prompt.contains("<FOCUS>"));
        assert!(prompt.contains("IMPORTANT for required_access"));
        assert!(prompt.contains("- Be specific"));
    }

    #[test]
    fn test_estimate_prompt_embeds_task_verbatim() {
        let task = "Add OAuth2 login\n  with \"Google\" {and} GitHub";
        let prompt = build_estimate_prompt(task);

        assert!(prompt.contains(task));
        assert!(prompt.starts_with("<ROLE>"));
    }

    #[test]
    fn test_estimate_prompt_names_every_field() {
        let prompt = build_estimate_prompt("Fix login bug");
        for field in [
            "\"title\"",
            "\"estimated_time\"",
            "\"priority\"",
            "\"complexity_level\"",
            "\"dependencies\"",
            "\"required_access\"",
            "\"suggested_labels\"",
            "\"reasoning\"",
        ] {
            assert!(prompt.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn test_estimate_prompt_requires_three_phases() {
        let prompt = build_estimate_prompt("Fix login bug");
        assert!(prompt.contains("Overview:"));
        assert!(prompt.contains("Phase 1: [First milestone name]"));
        assert!(prompt.contains("Phase 2: [Second milestone name]"));
        assert!(prompt.contains("Phase 3: [Third milestone name]"));
        assert!(!prompt.contains("Phase 4"));
    }
}
