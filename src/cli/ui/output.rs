use console::{StyledObject, style};

use crate::tracker::suggested_assignee;
use crate::types::{EstimateResult, Level, Ticket, TicketStatus};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<16} {}", style(format!("{}:", label)).dim(), value);
    }

    pub fn list(&self, label: &str, items: &[String]) {
        if items.is_empty() {
            self.field(label, style("none").dim());
            return;
        }
        self.field(label, items.join(", "));
    }

    /// Estimate summary with the reasoning narrative
    pub fn estimate(&self, result: &EstimateResult) {
        self.header(&result.title);
        if result.fallback {
            self.warning(&format!(
                "Fallback estimate: {}",
                result.error.as_deref().unwrap_or("AI service unavailable")
            ));
        }

        self.field("Estimated time", &result.estimated_time);
        self.field("Priority", level(result.priority));
        self.field("Complexity", level(result.complexity_level));
        self.list("Dependencies", &result.dependencies);
        self.list("Access", &result.required_access);
        self.list("Labels", &result.suggested_labels);

        match result.parsed_reasoning() {
            Some(reasoning) => {
                self.section("Plan");
                println!("{}", reasoning.overview);
                for (i, phase) in reasoning.phases.iter().enumerate() {
                    println!("\n{}", style(format!("Phase {}: {}", i + 1, phase.name)).bold());
                    for task in &phase.tasks {
                        println!("  - {}", task);
                    }
                }
            }
            None if !result.reasoning.is_empty() => {
                self.section("Reasoning");
                println!("{}", result.reasoning);
            }
            None => {}
        }
    }

    /// One-line board entry
    pub fn ticket_line(&self, ticket: &Ticket) {
        println!(
            "  {:>4}  {}  {:<12} {:>3}%  {}  {}",
            style(ticket.id).dim(),
            style(&ticket.ticket_number).cyan(),
            status(ticket.status),
            ticket.progress_percentage,
            level(ticket.priority),
            ticket.title
        );
    }

    /// Full ticket detail
    pub fn ticket(&self, ticket: &Ticket) {
        self.header(&format!("{}  {}", ticket.ticket_number, ticket.title));
        self.field("Id", ticket.id);
        self.field("Ticket id", &ticket.ticket_id);
        self.field("Status", status(ticket.status));
        self.field("Progress", format!("{}%", ticket.progress_percentage));
        self.field("Priority", level(ticket.priority));
        self.field("Estimated time", &ticket.estimated_time);
        self.field("Category", ticket.category.as_deref().unwrap_or("general"));
        self.list("Tags", &ticket.tags);
        self.list("Access", &ticket.access_required);
        self.list("Dependencies", &ticket.dependencies);
        self.field("Assignee", suggested_assignee(&ticket.access_required));
        self.field("Created", ticket.created_at.format("%Y-%m-%d %H:%M"));
        self.field("Updated", ticket.updated_at.format("%Y-%m-%d %H:%M"));
        if let Some(started) = ticket.started_at {
            self.field("Started", started.format("%Y-%m-%d %H:%M"));
        }
        if let Some(completed) = ticket.completed_at {
            self.field("Completed", completed.format("%Y-%m-%d %H:%M"));
        }
        if ticket.ai_generated {
            self.field("Source", "AI estimate");
        }

        if !ticket.description.is_empty() {
            self.section("Description");
            println!("{}", ticket.description);
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn level(level: Level) -> StyledObject<String> {
    let text = level.to_string();
    match level {
        Level::High => style(text).red(),
        Level::Medium => style(text).yellow(),
        Level::Low => style(text).green(),
    }
}

fn status(status: TicketStatus) -> StyledObject<&'static str> {
    let text = status.as_str();
    match status {
        TicketStatus::New => style(text).blue(),
        TicketStatus::InProgress => style(text).yellow(),
        TicketStatus::Review => style(text).magenta(),
        TicketStatus::Completed => style(text).green(),
        TicketStatus::Blocked => style(text).red(),
    }
}
