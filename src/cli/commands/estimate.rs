//! Estimate Command
//!
//! Estimate a task from the terminal, optionally saving it as a ticket.
//!
//! Usage:
//!   kanban-estimator estimate "Add OAuth login" [--save] [--format json]

use std::path::Path;

use serde_json::json;

use crate::ai::{EstimatorClient, create_shared_metrics};
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, OutputFormat, print_structured};
use crate::tracker::{DraftEdits, assemble_draft};
use crate::types::Result;

pub async fn run(
    database: Option<&Path>,
    task: &str,
    save: bool,
    format: OutputFormat,
) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let estimator = EstimatorClient::from_config(&ctx.config, create_shared_metrics());

    let result = estimator.estimate(task).await?;
    let draft = assemble_draft(task.trim(), &result);

    let ticket = if save {
        Some(ctx.tracker().create_ticket(draft.clone(), DraftEdits::default())?)
    } else {
        None
    };

    if format != OutputFormat::Text {
        let output = json!({
            "estimate": result,
            "draft": draft,
            "ticket": ticket,
        });
        return print_structured(&output, format);
    }

    let out = Output::new();
    out.estimate(&result);

    match ticket {
        Some(ticket) => {
            println!();
            out.success(&format!(
                "Ticket {} created (id {})",
                ticket.ticket_number, ticket.id
            ));
        }
        None => {
            println!();
            out.info(&format!(
                "Draft {} not saved; rerun with --save to create the ticket",
                draft.ticket_number
            ));
        }
    }

    Ok(())
}
