//! Route handlers
//!
//! Every JSON body carries `success`; failures go through
//! [`AppError`]'s `IntoResponse`. Ticket store calls are synchronous and run
//! on the blocking pool.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use crate::constants::server;
use crate::tracker::{
    Board, DashboardStats, DraftEdits, HistoricalStats, Tracker, assemble_draft,
    suggested_assignee,
};
use crate::types::{AppError, EstimateResult, Result, Ticket, TicketDraft, TicketUpdate};

const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/info",
    "POST /api/estimate",
    "POST /api/create-ticket",
    "GET /api/tickets",
    "GET /api/kanban-tickets",
    "PATCH /api/kanban-tickets/:id",
    "DELETE /api/kanban-tickets/:id",
    "POST /api/kanban-tickets/reset",
    "GET /api/kanban-tickets/:id/detail",
    "GET /api/ticket/:identifier",
    "PATCH /api/ticket/:identifier",
    "GET /api/dashboard-stats",
    "GET /api/historical-stats",
];

/// Run tracker work off the async workers
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(Tracker) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let tracker = state.tracker();
    tokio::task::spawn_blocking(move || f(tracker))
        .await
        .map_err(|e| AppError::Storage(format!("Ticket store task failed: {}", e)))?
}

// =============================================================================
// Service
// =============================================================================

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": server::SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
        "estimator": {
            "name": state.estimator.name(),
            "available": state.estimator.is_available(),
        },
        "metrics": state.metrics.summary(),
    }))
}

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": server::SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "database": state.config.database.path,
        "model": state.config.llm.model,
        "endpoints_available": ENDPOINTS,
        "metrics": state.metrics.summary(),
    }))
}

// =============================================================================
// Estimate
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    #[serde(default)]
    pub task: String,
}

/// Estimate plus the draft a client previews before creating the ticket
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    #[serde(flatten)]
    pub result: EstimateResult,
    pub draft: TicketDraft,
}

pub async fn estimate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>> {
    let Json(request) = payload?;
    let result = state.estimator.estimate(&request.task).await?;
    let draft = assemble_draft(request.task.trim(), &result);

    Ok(Json(EstimateResponse { result, draft }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(flatten)]
    pub draft: TicketDraft,
    #[serde(flatten)]
    pub edits: DraftEdits,
}

pub async fn create_ticket(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    let ticket = blocking(&state, move |tracker| {
        tracker.create_ticket(request.draft, request.edits)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Ticket {} created successfully!", ticket.ticket_number),
        "ticket": ticket,
    })))
}

// =============================================================================
// Tickets
// =============================================================================

pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Value>> {
    let tickets = blocking(&state, |tracker| tracker.list(None)).await?;
    Ok(Json(json!({
        "success": true,
        "count": tickets.len(),
        "tickets": tickets,
    })))
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub success: bool,
    pub tickets: Board,
}

pub async fn kanban_board(State(state): State<AppState>) -> Result<Json<BoardResponse>> {
    Ok(Json(BoardResponse {
        success: true,
        tickets: blocking(&state, |tracker| tracker.board()).await?,
    }))
}

pub async fn update_kanban_ticket(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<TicketUpdate>, JsonRejection>,
) -> Result<Json<Value>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let change = blocking(&state, move |tracker| tracker.update(id, &update)).await?;

    Ok(Json(json!({
        "success": true,
        "ticket": change.ticket,
    })))
}

pub async fn delete_kanban_ticket(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>> {
    let Path(id) = id?;
    let ticket = blocking(&state, move |tracker| tracker.delete(&id.to_string())).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Ticket {} deleted", ticket.ticket_number),
        "ticket": ticket,
    })))
}

pub async fn reset_tickets(State(state): State<AppState>) -> Result<Json<Value>> {
    let count = blocking(&state, |tracker| tracker.reset_all()).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Reset {} tickets to new status", count),
    })))
}

pub async fn ticket_detail(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>> {
    let Path(id) = id?;
    let ticket = blocking(&state, move |tracker| tracker.get(id)).await?;
    Ok(Json(ticket_body(ticket)))
}

pub async fn lookup_ticket(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>> {
    let ticket = blocking(&state, move |tracker| tracker.find(&identifier)).await?;
    Ok(Json(ticket_body(ticket)))
}

/// Preview-page edits; only status and tags are honored
#[derive(Debug, Deserialize)]
pub struct PreviewUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    payload: std::result::Result<Json<PreviewUpdate>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(edit) = payload?;
    let update = TicketUpdate {
        status: edit.status,
        tags: edit.tags,
        ..Default::default()
    };
    let change = blocking(&state, move |tracker| {
        tracker.update_by_identifier(&identifier, &update)
    })
    .await?;

    let message = if change.outcome.changed {
        "Ticket updated successfully"
    } else {
        "No changes made"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "old_status": change.outcome.old_status,
        "ticket": change.ticket,
    })))
}

fn ticket_body(ticket: Ticket) -> Value {
    json!({
        "success": true,
        "suggested_assignee": suggested_assignee(&ticket.access_required),
        "ticket": ticket,
    })
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

pub async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardResponse>> {
    Ok(Json(DashboardResponse {
        success: true,
        stats: blocking(&state, |tracker| tracker.dashboard()).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub history: HistoricalStats,
}

pub async fn historical_stats(State(state): State<AppState>) -> Result<Json<HistoryResponse>> {
    Ok(Json(HistoryResponse {
        success: true,
        history: blocking(&state, |tracker| tracker.history()).await?,
    }))
}
