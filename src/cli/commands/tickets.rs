//! Tickets Command
//!
//! Inspect and move tickets on the board.
//!
//! Usage:
//!   kanban-estimator tickets list [--status in_progress] [--format json]
//!   kanban-estimator tickets show <id|TKT-number|ticket-id>
//!   kanban-estimator tickets move <ident> <status> [--progress 40]
//!   kanban-estimator tickets tag <ident> <tags>...
//!   kanban-estimator tickets delete <ident>
//!   kanban-estimator tickets reset

use std::path::Path;

use console::style;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, OutputFormat, print_structured};
use crate::types::{Result, TicketStatus, TicketUpdate};

pub fn list(database: Option<&Path>, status: Option<&str>, format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let status = status.map(str::parse::<TicketStatus>).transpose()?;
    let tracker = ctx.tracker();

    if format != OutputFormat::Text {
        return match status {
            Some(status) => print_structured(&tracker.list(Some(status))?, format),
            None => print_structured(&tracker.board()?, format),
        };
    }

    let out = Output::new();
    let board = tracker.board()?;
    let columns: Vec<TicketStatus> = match status {
        Some(status) => vec![status],
        None => TicketStatus::ALL.to_vec(),
    };

    for column in columns {
        let tickets = board.column(column);
        out.section(&format!("{} ({})", column, tickets.len()));
        if tickets.is_empty() {
            println!("  {}", style("empty").dim());
        }
        for ticket in tickets {
            out.ticket_line(ticket);
        }
    }

    Ok(())
}

pub fn show(database: Option<&Path>, identifier: &str, format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let ticket = ctx.tracker().find(identifier)?;

    if format != OutputFormat::Text {
        return print_structured(&ticket, format);
    }

    Output::new().ticket(&ticket);
    Ok(())
}

pub fn move_to(
    database: Option<&Path>,
    identifier: &str,
    status: &str,
    progress: Option<u8>,
) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let update = TicketUpdate {
        status: Some(status.to_string()),
        progress_percentage: progress.map(i64::from),
        ..Default::default()
    };

    let change = ctx.tracker().update_by_identifier(identifier, &update)?;
    let out = Output::new();
    if change.outcome.changed {
        out.success(&format!(
            "{}: {} → {} ({}%)",
            change.ticket.ticket_number,
            change.outcome.old_status,
            change.ticket.status,
            change.ticket.progress_percentage
        ));
    } else {
        out.info(&format!("{}: no changes made", change.ticket.ticket_number));
    }
    Ok(())
}

pub fn tag(database: Option<&Path>, identifier: &str, tags: Vec<String>) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let update = TicketUpdate {
        tags: Some(tags),
        ..Default::default()
    };

    let change = ctx.tracker().update_by_identifier(identifier, &update)?;
    Output::new().success(&format!(
        "{} tags: {}",
        change.ticket.ticket_number,
        change.ticket.tags.join(", ")
    ));
    Ok(())
}

pub fn delete(database: Option<&Path>, identifier: &str) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let ticket = ctx.tracker().delete(identifier)?;
    Output::new().success(&format!(
        "Deleted {}: {}",
        ticket.ticket_number, ticket.title
    ));
    Ok(())
}

pub fn reset(database: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let count = ctx.tracker().reset_all()?;
    Output::new().success(&format!("Reset {} tickets to new status", count));
    Ok(())
}
