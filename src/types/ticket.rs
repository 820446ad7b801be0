//! Ticket Types
//!
//! Draft (assembled, not yet persisted) and stored ticket records plus the
//! Kanban stage they move through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::estimate::Level;

/// Kanban stage of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    New,
    InProgress,
    Review,
    Completed,
    Blocked,
}

impl TicketStatus {
    /// Board column order
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::New,
        TicketStatus::InProgress,
        TicketStatus::Review,
        TicketStatus::Completed,
        TicketStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Review => "review",
            TicketStatus::Completed => "completed",
            TicketStatus::Blocked => "blocked",
        }
    }

    /// Statuses counted as active work
    pub fn is_active(&self) -> bool {
        !matches!(self, TicketStatus::Completed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = crate::types::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(TicketStatus::New),
            "in_progress" => Ok(TicketStatus::InProgress),
            "review" => Ok(TicketStatus::Review),
            "completed" => Ok(TicketStatus::Completed),
            "blocked" => Ok(TicketStatus::Blocked),
            other => Err(crate::types::AppError::InvalidStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Estimate fields carried onto a ticket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateSummary {
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub priority: Level,
    #[serde(default)]
    pub complexity_level: Level,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub required_access: Vec<String>,
    #[serde(default)]
    pub suggested_labels: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// Fields needed to create a ticket, assembled from an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDraft {
    /// Blank ids are regenerated when the draft is accepted
    #[serde(default)]
    pub ticket_id: String,
    #[serde(default)]
    pub ticket_number: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub estimate: EstimateSummary,
    /// Whether the estimate came from the live model
    #[serde(default)]
    pub ai_generated: bool,
}

// =============================================================================
// Stored Ticket
// =============================================================================

/// One recorded stage/progress change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: DateTime<Utc>,
    pub status: TicketStatus,
    pub progress: u8,
}

/// Ticket record ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub ticket_id: String,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub priority: Level,
    pub estimated_time: String,
    pub tags: Vec<String>,
    pub access_required: Vec<String>,
    pub dependencies: Vec<String>,
    pub ai_generated: bool,
}

/// Persisted ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub ticket_id: String,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub category: Option<String>,
    pub priority: Level,
    pub estimated_time: String,
    pub progress_percentage: u8,
    pub tags: Vec<String>,
    pub access_required: Vec<String>,
    pub dependencies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ai_generated: bool,
    pub progress_history: Vec<ProgressEntry>,
}

/// Partial tracker update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress_percentage: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
}
