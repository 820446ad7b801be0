//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/kanban-estimator/config.toml)
//! 3. Project config (.kanban/config.toml)
//! 4. Environment variables (KANBAN_*, GEMINI_API_KEY, GEMINI_MODEL)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
