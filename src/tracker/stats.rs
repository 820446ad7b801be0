//! Dashboard Statistics
//!
//! Aggregates over the loaded ticket set: column counts, completion
//! percentages, the on-hold breakdown, and six-month history.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

use crate::constants::tracker;
use crate::types::{Ticket, TicketStatus};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileCount {
    pub count: usize,
}

/// Share of blocked tickets per hold reason, in rounded percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OnHoldCategories {
    #[serde(rename = "Pending Reviews")]
    pub pending_reviews: u32,
    #[serde(rename = "Access Issue")]
    pub access_issue: u32,
    #[serde(rename = "Code Quality")]
    pub code_quality: u32,
    #[serde(rename = "Other")]
    pub other: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnHoldTile {
    pub count: usize,
    pub categories: OnHoldCategories,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Tiles {
    pub new: TileCount,
    pub in_progress: TileCount,
    pub review: TileCount,
    pub completed: TileCount,
    pub on_hold: OnHoldTile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_tickets: usize,
    /// Rounded mean progress over tickets not yet completed
    pub completion_status: u32,
    /// Mean progress of in-progress tickets
    pub average_in_progress: f64,
    pub tiles: Tiles,
}

/// Compute the dashboard tiles
pub fn dashboard_stats(tickets: &[Ticket]) -> DashboardStats {
    let count = |status: TicketStatus| tickets.iter().filter(|t| t.status == status).count();

    let in_progress: Vec<u8> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::InProgress)
        .map(|t| t.progress_percentage)
        .collect();

    let blocked: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Blocked)
        .collect();

    DashboardStats {
        total_tickets: tickets.len(),
        completion_status: completion_status(tickets),
        average_in_progress: mean(in_progress.iter().map(|&p| p as f64)),
        tiles: Tiles {
            new: TileCount {
                count: count(TicketStatus::New),
            },
            in_progress: TileCount {
                count: in_progress.len(),
            },
            review: TileCount {
                count: count(TicketStatus::Review),
            },
            completed: TileCount {
                count: count(TicketStatus::Completed),
            },
            on_hold: OnHoldTile {
                count: blocked.len(),
                categories: on_hold_categories(&blocked),
            },
        },
    }
}

/// Status-weighted progress of a ticket still on the board
fn active_weight(ticket: &Ticket) -> Option<f64> {
    match ticket.status {
        TicketStatus::Completed => None,
        TicketStatus::New => Some(0.0),
        TicketStatus::Review => Some(tracker::REVIEW_WEIGHT as f64),
        TicketStatus::InProgress | TicketStatus::Blocked => Some(ticket.progress_percentage as f64),
    }
}

fn completion_status(tickets: &[Ticket]) -> u32 {
    mean(tickets.iter().filter_map(active_weight)).round() as u32
}

fn on_hold_categories(blocked: &[&Ticket]) -> OnHoldCategories {
    if blocked.is_empty() {
        return OnHoldCategories::default();
    }

    let mut counts = [0usize; 4];
    for ticket in blocked {
        let category = ticket.category.as_deref().unwrap_or("Other").to_lowercase();
        let slot = if category.contains("review") {
            0
        } else if category.contains("access") {
            1
        } else if category.contains("quality") || category.contains("code") {
            2
        } else {
            3
        };
        counts[slot] += 1;
    }

    let pct = |n: usize| ((n as f64 / blocked.len() as f64) * 100.0).round() as u32;
    OnHoldCategories {
        pending_reviews: pct(counts[0]),
        access_issue: pct(counts[1]),
        code_quality: pct(counts[2]),
        other: pct(counts[3]),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

// =============================================================================
// History
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalStats {
    pub new_tickets: Series,
    pub completed_tickets: Series,
}

/// `(year, month)` buckets, oldest first, stepping back 30 days at a time
fn month_buckets(now: DateTime<Utc>) -> Vec<(i32, u32)> {
    (0..tracker::HISTORY_MONTHS)
        .rev()
        .map(|i| {
            let date = now - Duration::days(tracker::HISTORY_STEP_DAYS * i);
            (date.year(), date.month())
        })
        .collect()
}

/// Created and completed ticket counts per month bucket
pub fn historical_stats(tickets: &[Ticket], now: DateTime<Utc>) -> HistoricalStats {
    let buckets = month_buckets(now);
    let labels: Vec<String> = buckets
        .iter()
        .map(|&(_, month)| MONTH_LABELS[(month - 1) as usize].to_string())
        .collect();

    let in_bucket =
        |date: &DateTime<Utc>, &(year, month): &(i32, u32)| date.year() == year && date.month() == month;

    let created = buckets
        .iter()
        .map(|b| tickets.iter().filter(|t| in_bucket(&t.created_at, b)).count())
        .collect();

    let completed = buckets
        .iter()
        .map(|b| {
            tickets
                .iter()
                .filter(|t| t.status == TicketStatus::Completed)
                .filter(|t| t.completed_at.as_ref().is_some_and(|d| in_bucket(d, b)))
                .count()
        })
        .collect();

    HistoricalStats {
        new_tickets: Series {
            labels: labels.clone(),
            values: created,
        },
        completed_tickets: Series {
            labels,
            values: completed,
        },
    }
}
