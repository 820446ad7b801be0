//! Stage Transitions
//!
//! Tracker mutations applied to a loaded [`Ticket`] before it is saved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::constants::tracker;
use crate::types::{ProgressEntry, Result, Ticket, TicketStatus, TicketUpdate};

/// Result of applying an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub changed: bool,
    pub old_status: TicketStatus,
}

/// Fields compared to decide whether an update changed anything
#[derive(PartialEq)]
struct Tracked {
    status: TicketStatus,
    progress: u8,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    tags: Vec<String>,
    category: Option<String>,
}

impl Tracked {
    fn of(ticket: &Ticket) -> Self {
        Self {
            status: ticket.status,
            progress: ticket.progress_percentage,
            started_at: ticket.started_at,
            completed_at: ticket.completed_at,
            tags: ticket.tags.clone(),
            category: ticket.category.clone(),
        }
    }
}

/// Apply a partial update.
///
/// The status string is validated before anything is touched.
pub fn apply_update(
    ticket: &mut Ticket,
    update: &TicketUpdate,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome> {
    let status = update
        .status
        .as_deref()
        .map(str::parse::<TicketStatus>)
        .transpose()?;

    let before = Tracked::of(ticket);

    if let Some(status) = status {
        enter_status(ticket, status, now);
    }

    if let Some(progress) = update.progress_percentage {
        ticket.progress_percentage = progress.clamp(0, 100) as u8;
    }

    if let Some(tags) = &update.tags {
        ticket.tags = tags.clone();
    }

    if let Some(category) = &update.category {
        ticket.category = Some(category.clone());
    }

    let changed = Tracked::of(ticket) != before;
    if changed {
        touch(ticket, now);
    }

    debug!(
        ticket = %ticket.ticket_number,
        from = %before.status,
        to = %ticket.status,
        changed,
        "Applied ticket update"
    );

    Ok(UpdateOutcome {
        changed,
        old_status: before.status,
    })
}

fn enter_status(ticket: &mut Ticket, status: TicketStatus, now: DateTime<Utc>) {
    ticket.status = status;

    match status {
        TicketStatus::InProgress if ticket.started_at.is_none() => {
            ticket.started_at = Some(now);
            if ticket.progress_percentage == 0 {
                ticket.progress_percentage = tracker::INITIAL_IN_PROGRESS;
            }
        }
        TicketStatus::Completed if ticket.completed_at.is_none() => {
            ticket.completed_at = Some(now);
            ticket.progress_percentage = 100;
        }
        TicketStatus::New => {
            ticket.progress_percentage = 0;
            ticket.started_at = None;
            ticket.completed_at = None;
        }
        _ => {}
    }
}

/// Put a ticket back on the `new` column. Returns whether it changed.
pub fn reset(ticket: &mut Ticket, now: DateTime<Utc>) -> bool {
    let before = Tracked::of(ticket);
    enter_status(ticket, TicketStatus::New, now);

    let changed = Tracked::of(ticket) != before;
    if changed {
        touch(ticket, now);
    }
    changed
}

fn touch(ticket: &mut Ticket, now: DateTime<Utc>) {
    ticket.updated_at = now;
    ticket.progress_history.push(ProgressEntry {
        timestamp: now,
        status: ticket.status,
        progress: ticket.progress_percentage,
    });
}

// =============================================================================
// Board
// =============================================================================

/// Tickets grouped by Kanban column
#[derive(Debug, Clone, Default, Serialize)]
pub struct Board {
    pub new: Vec<Ticket>,
    pub in_progress: Vec<Ticket>,
    pub review: Vec<Ticket>,
    pub completed: Vec<Ticket>,
    pub blocked: Vec<Ticket>,
}

impl Board {
    pub fn column(&self, status: TicketStatus) -> &[Ticket] {
        match status {
            TicketStatus::New => &self.new,
            TicketStatus::InProgress => &self.in_progress,
            TicketStatus::Review => &self.review,
            TicketStatus::Completed => &self.completed,
            TicketStatus::Blocked => &self.blocked,
        }
    }
}

/// Group tickets by status, keeping their order within each column
pub fn group_by_status(tickets: Vec<Ticket>) -> Board {
    let mut board = Board::default();
    for ticket in tickets {
        let column = match ticket.status {
            TicketStatus::New => &mut board.new,
            TicketStatus::InProgress => &mut board.in_progress,
            TicketStatus::Review => &mut board.review,
            TicketStatus::Completed => &mut board.completed,
            TicketStatus::Blocked => &mut board.blocked,
        };
        column.push(ticket);
    }
    board
}

/// Role best suited to a ticket's access requirements
pub fn suggested_assignee(required_access: &[String]) -> &'static str {
    let has = |name: &str| required_access.iter().any(|a| a == name);

    if has("Backend") && has("Frontend") {
        "Full Stack Developer"
    } else if has("Backend") {
        "Backend Developer"
    } else if has("Frontend") {
        "Frontend Developer"
    } else if has("Database") {
        "Database Administrator"
    } else if has("DevOps") {
        "DevOps Engineer"
    } else {
        "General Developer"
    }
}
