//! Config Command
//!
//! Usage:
//!   kanban-estimator config show [-f json|yaml]
//!   kanban-estimator config path
//!   kanban-estimator config init [-g] [--force]

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{OutputFormat, load_config};
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(database: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(database)?;
    ConfigLoader::show_config(&config, format.as_str())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let scope = if global { "global" } else { "project" };
    Output::new().success(&format!("Initialized {} configuration", scope));
    println!("  Config: {}", path.display());
    Ok(())
}
