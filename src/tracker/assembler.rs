//! Ticket Assembler
//!
//! Turns an estimate plus the original task text into a [`TicketDraft`], and
//! an accepted draft plus user edits into a [`NewTicket`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants::ticket;
use crate::types::{
    AppError, EstimateResult, EstimateSummary, Level, NewTicket, Result, TicketDraft,
    capitalize_first,
};

/// Stable identifier for a task text: leading hex of its SHA-256
pub fn ticket_id_for(task: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(task.as_bytes()));
    digest[..ticket::ID_HEX_LEN].to_string()
}

/// Fresh human-facing number, e.g. `TKT-3F2A9C1B`
pub fn new_ticket_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}",
        ticket::NUMBER_PREFIX,
        id[..ticket::NUMBER_LEN].to_uppercase()
    )
}

/// First words of the task with the first character uppercased
pub fn derive_title(task: &str) -> String {
    let words: Vec<&str> = task
        .split_whitespace()
        .take(ticket::TITLE_MAX_WORDS)
        .collect();

    if words.is_empty() {
        return ticket::DEFAULT_TITLE.to_string();
    }

    capitalize_first(&words.join(" "))
}

/// Model title when it is short enough to be a card title, else derived
pub fn choose_title(model_title: &str, task: &str) -> String {
    let trimmed = model_title.trim();
    let word_count = trimmed.split_whitespace().count();

    if (ticket::TITLE_MIN_WORDS..=ticket::TITLE_MAX_WORDS).contains(&word_count) {
        trimmed.to_string()
    } else {
        derive_title(task)
    }
}

/// Assemble the preview draft for an estimate
pub fn assemble_draft(task: &str, estimate: &EstimateResult) -> TicketDraft {
    TicketDraft {
        ticket_id: ticket_id_for(task),
        ticket_number: new_ticket_number(),
        task: task.to_string(),
        title: choose_title(&estimate.title, task),
        estimate: EstimateSummary {
            estimated_time: estimate.estimated_time.clone(),
            priority: estimate.priority,
            complexity_level: estimate.complexity_level,
            dependencies: estimate.dependencies.clone(),
            required_access: estimate.required_access.clone(),
            suggested_labels: estimate.suggested_labels.clone(),
            reasoning: estimate.reasoning.clone(),
        },
        ai_generated: !estimate.fallback,
    }
}

/// User edits applied when a draft is accepted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftEdits {
    #[serde(default)]
    pub edited_title: Option<String>,
    #[serde(default)]
    pub edited_description: Option<String>,
    #[serde(default)]
    pub edited_priority: Option<String>,
}

/// Build the insert record for an accepted draft
pub fn accept_draft(draft: TicketDraft, edits: DraftEdits) -> Result<NewTicket> {
    let priority = match edits.edited_priority.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.parse::<Level>().map_err(AppError::Validation)?,
        _ => draft.estimate.priority,
    };

    let title = non_blank(edits.edited_title).unwrap_or_else(|| {
        if draft.title.trim().is_empty() {
            derive_title(&draft.task)
        } else {
            draft.title.clone()
        }
    });

    let description = non_blank(edits.edited_description).unwrap_or_else(|| draft.task.clone());

    let ticket_id = if draft.ticket_id.trim().is_empty() {
        ticket_id_for(&draft.task)
    } else {
        draft.ticket_id
    };

    let ticket_number = if draft.ticket_number.trim().is_empty() {
        new_ticket_number()
    } else {
        draft.ticket_number
    };

    Ok(NewTicket {
        ticket_id,
        ticket_number,
        title,
        description,
        priority,
        estimated_time: draft.estimate.estimated_time,
        tags: draft.estimate.suggested_labels,
        access_required: draft.estimate.required_access,
        dependencies: draft.estimate.dependencies,
        ai_generated: draft.ai_generated,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
