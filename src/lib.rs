//! Kanban Estimator - AI Task Estimates with a Kanban Tracker
//!
//! Turns a free-text task description into a structured effort estimate
//! through an LLM, previews it as a ticket draft, and tracks accepted tickets
//! across a five-column board.
//!
//! ## Core Features
//!
//! - **Estimate Pipeline**: prompt, provider call with exponential backoff on
//!   transient failures, response normalization, canned fallback
//! - **Ticket Tracker**: SQLite store with stage transitions and history
//! - **Dashboard**: column tiles, completion percentage, six-month history
//! - **HTTP API + CLI**: the same operations over axum and clap
//!
//! ## Quick Start
//!
//! ```ignore
//! use kanban_estimator::{ConfigLoader, Database, EstimatorClient, Tracker};
//! use kanban_estimator::ai::create_shared_metrics;
//! use kanban_estimator::tracker::{DraftEdits, assemble_draft};
//!
//! let config = ConfigLoader::load()?;
//! let estimator = EstimatorClient::from_config(&config, create_shared_metrics());
//! let result = estimator.estimate("Add OAuth login to the admin panel").await?;
//!
//! let db = Database::open(&config.database.path)?;
//! db.initialize()?;
//! let tracker = Tracker::new(Arc::new(db));
//! let draft = assemble_draft("Add OAuth login to the admin panel", &result);
//! let ticket = tracker.create_ticket(draft, DraftEdits::default())?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: prompt, provider, retry, normalization and fallback
//! - [`tracker`]: ticket assembly, transitions, dashboard statistics
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`server`]: HTTP API
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod server;
pub mod storage;
pub mod tracker;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{AppError, ErrorCategory, EstimateError, Result, ResultExt};
pub use types::{EstimateResult, Level, Ticket, TicketDraft, TicketStatus, TicketUpdate};

pub use storage::{Database, PoolConfig, SharedDatabase};

pub use ai::{EstimatorClient, LlmProvider, SharedMetrics};
pub use tracker::Tracker;
