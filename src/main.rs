use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanban_estimator::cli::OutputFormat;
use kanban_estimator::cli::commands;

#[derive(Parser)]
#[command(name = "kanban-estimator")]
#[command(
    version,
    about = "AI task estimates and a Kanban ticket tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Ticket database path (overrides config)")]
    database: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, help = "Bind host (overrides config)")]
        host: Option<String>,
        #[arg(long, short, help = "Bind port (overrides config)")]
        port: Option<u16>,
    },

    /// Estimate a task description
    Estimate {
        #[arg(help = "Task description")]
        task: String,
        #[arg(long, help = "Save the estimate as a new ticket")]
        save: bool,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Inspect and move tickets
    Tickets {
        #[command(subcommand)]
        action: TicketAction,
    },

    /// Show dashboard statistics
    Stats {
        #[arg(long, help = "Show six-month created/completed history")]
        history: bool,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TicketAction {
    /// List tickets grouped by column
    List {
        #[arg(long, short, help = "Only this status: new, in_progress, review, completed, blocked")]
        status: Option<String>,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show one ticket by id, ticket number or ticket id
    Show {
        identifier: String,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Move a ticket to another column
    Move {
        identifier: String,
        status: String,
        #[arg(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: Option<u8>,
    },
    /// Replace a ticket's tags
    Tag {
        identifier: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Delete a ticket
    Delete { identifier: String },
    /// Move every ticket back to new
    Reset,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mkanban-estimator encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let database = cli.database.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::serve::run(database, host, port))?;
        }
        Commands::Estimate { task, save, format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::estimate::run(database, &task, save, format))?;
        }
        Commands::Tickets { action } => match action {
            TicketAction::List { status, format } => {
                commands::tickets::list(database, status.as_deref(), format)?;
            }
            TicketAction::Show { identifier, format } => {
                commands::tickets::show(database, &identifier, format)?;
            }
            TicketAction::Move {
                identifier,
                status,
                progress,
            } => {
                commands::tickets::move_to(database, &identifier, &status, progress)?;
            }
            TicketAction::Tag { identifier, tags } => {
                commands::tickets::tag(database, &identifier, tags)?;
            }
            TicketAction::Delete { identifier } => {
                commands::tickets::delete(database, &identifier)?;
            }
            TicketAction::Reset => {
                commands::tickets::reset(database)?;
            }
        },
        Commands::Stats { history, format } => {
            commands::stats::run(database, history, format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                commands::config::show(database, format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
