//! Stats Command
//!
//! Dashboard tiles and six-month history.

use std::path::Path;

use console::style;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, OutputFormat, print_structured};
use crate::tracker::Series;
use crate::types::Result;

pub fn run(database: Option<&Path>, history: bool, format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load(database)?;
    let tracker = ctx.tracker();

    if history {
        let stats = tracker.history()?;
        if format != OutputFormat::Text {
            return print_structured(&stats, format);
        }

        let out = Output::new();
        out.section("Created tickets");
        print_series(&stats.new_tickets);
        out.section("Completed tickets");
        print_series(&stats.completed_tickets);
        return Ok(());
    }

    let stats = tracker.dashboard()?;
    if format != OutputFormat::Text {
        return print_structured(&stats, format);
    }

    let out = Output::new();
    let tiles = &stats.tiles;
    out.header("Dashboard");
    out.field("Total", stats.total_tickets);
    out.field("Completion", format!("{}%", stats.completion_status));
    out.field(
        "Avg in progress",
        format!("{:.1}%", stats.average_in_progress),
    );

    out.section("Columns");
    out.field("New", tiles.new.count);
    out.field("In progress", tiles.in_progress.count);
    out.field("Review", tiles.review.count);
    out.field("Completed", tiles.completed.count);
    out.field("On hold", tiles.on_hold.count);

    if tiles.on_hold.count > 0 {
        let hold = &tiles.on_hold.categories;
        out.section("On hold");
        out.field("Pending Reviews", format!("{}%", hold.pending_reviews));
        out.field("Access Issue", format!("{}%", hold.access_issue));
        out.field("Code Quality", format!("{}%", hold.code_quality));
        out.field("Other", format!("{}%", hold.other));
    }

    Ok(())
}

fn print_series(series: &Series) {
    let max = series.values.iter().copied().max().unwrap_or(0).max(1);
    for (label, value) in series.labels.iter().zip(&series.values) {
        let bar = "█".repeat(value * 30 / max);
        println!("  {:<4} {:>4} {}", label, value, style(bar).cyan());
    }
}
