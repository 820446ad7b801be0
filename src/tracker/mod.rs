//! Kanban Tracker
//!
//! Ticket assembly from estimates, stage transitions, and dashboard
//! aggregates. [`Tracker`] ties these to the ticket store and is shared by
//! the HTTP handlers and the CLI.

mod assembler;
mod stats;
mod transitions;

pub use assembler::{
    DraftEdits, accept_draft, assemble_draft, choose_title, derive_title, new_ticket_number,
    ticket_id_for,
};
pub use stats::{
    DashboardStats, HistoricalStats, OnHoldCategories, OnHoldTile, Series, TileCount, Tiles,
    dashboard_stats, historical_stats,
};
pub use transitions::{Board, UpdateOutcome, apply_update, group_by_status, reset, suggested_assignee};

use chrono::Utc;
use tracing::info;

use crate::storage::SharedDatabase;
use crate::types::{AppError, Result, Ticket, TicketDraft, TicketStatus, TicketUpdate};

/// Updated ticket plus what the update did
#[derive(Debug, Clone)]
pub struct TicketChange {
    pub ticket: Ticket,
    pub outcome: UpdateOutcome,
}

/// Ticket operations over the shared store
#[derive(Debug, Clone)]
pub struct Tracker {
    db: SharedDatabase,
}

impl Tracker {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Persist an accepted draft as a `new` ticket
    pub fn create_ticket(&self, draft: TicketDraft, edits: DraftEdits) -> Result<Ticket> {
        let new_ticket = accept_draft(draft, edits)?;
        let ticket = self.db.insert_ticket(&new_ticket)?;
        info!(
            id = ticket.id,
            ticket_number = %ticket.ticket_number,
            "Created ticket"
        );
        Ok(ticket)
    }

    pub fn get(&self, id: i64) -> Result<Ticket> {
        self.db
            .get_ticket(id)?
            .ok_or_else(|| AppError::not_found(format!("Ticket {}", id)))
    }

    /// Resolve a row id, ticket number or ticket id
    pub fn find(&self, identifier: &str) -> Result<Ticket> {
        self.db
            .find_by_identifier(identifier)?
            .ok_or_else(|| AppError::not_found(format!("Ticket {}", identifier)))
    }

    pub fn list(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>> {
        match status {
            Some(status) => self.db.list_by_status(status),
            None => self.db.list_tickets(),
        }
    }

    pub fn board(&self) -> Result<Board> {
        Ok(group_by_status(self.db.list_tickets()?))
    }

    /// Apply a tracker update to the ticket with row id `id`
    pub fn update(&self, id: i64, update: &TicketUpdate) -> Result<TicketChange> {
        let now = Utc::now();
        let mut applied = None;
        let ticket = self.db.update_ticket(id, |ticket| {
            let outcome = apply_update(ticket, update, now)?;
            applied = Some(outcome);
            Ok(outcome.changed)
        })?;

        let outcome = applied.unwrap_or(UpdateOutcome {
            changed: false,
            old_status: ticket.status,
        });
        if outcome.changed {
            info!(
                id,
                from = %outcome.old_status,
                to = %ticket.status,
                progress = ticket.progress_percentage,
                "Updated ticket"
            );
        }
        Ok(TicketChange { ticket, outcome })
    }

    /// Apply a tracker update to a ticket looked up by any identifier
    pub fn update_by_identifier(
        &self,
        identifier: &str,
        update: &TicketUpdate,
    ) -> Result<TicketChange> {
        let ticket = self.find(identifier)?;
        self.update(ticket.id, update)
    }

    /// Remove a ticket by any identifier; returns the removed ticket
    pub fn delete(&self, identifier: &str) -> Result<Ticket> {
        let ticket = self.find(identifier)?;
        if !self.db.delete_ticket(ticket.id)? {
            return Err(AppError::not_found(format!("Ticket {}", identifier)));
        }
        info!(id = ticket.id, ticket_number = %ticket.ticket_number, "Deleted ticket");
        Ok(ticket)
    }

    pub fn reset_all(&self) -> Result<usize> {
        self.db.reset_all(Utc::now())
    }

    pub fn dashboard(&self) -> Result<DashboardStats> {
        Ok(dashboard_stats(&self.db.list_tickets()?))
    }

    pub fn history(&self) -> Result<HistoricalStats> {
        Ok(historical_stats(&self.db.list_tickets()?, Utc::now()))
    }
}
