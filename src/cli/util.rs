//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::Path;
use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;

use crate::config::{Config, ConfigLoader};
use crate::storage::{Database, SharedDatabase};
use crate::tracker::Tracker;
use crate::types::Result;

/// Output format shared by read-only commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

/// Command execution context
///
/// Loaded configuration plus an opened, initialized ticket store.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub db: SharedDatabase,
}

impl CommandContext {
    /// Load config and open the ticket store.
    ///
    /// `database` overrides the configured store path.
    pub fn load(database: Option<&Path>) -> Result<Self> {
        let config = load_config(database)?;
        let db = open_database(&config.database.path)?;

        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }

    pub fn tracker(&self) -> Tracker {
        Tracker::new(self.db.clone())
    }
}

/// Resolve configuration and apply the `--database` flag
pub fn load_config(database: Option<&Path>) -> Result<Config> {
    let mut config = ConfigLoader::load()?;
    if let Some(path) = database {
        config.database.path = path.to_path_buf();
    }
    Ok(config)
}

/// Open and initialize the ticket store
pub fn open_database(path: &Path) -> Result<Database> {
    let db = Database::open(path)?;
    db.initialize()?;
    Ok(db)
}

/// Print a value as pretty JSON or YAML
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_database_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir.path().join("tickets.db")).unwrap();
        assert_eq!(db.count_tickets().unwrap(), 0);
    }

    #[test]
    fn test_output_format_names() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert_eq!(OutputFormat::Json.as_str(), "json");
        assert_eq!(
            OutputFormat::from_str("yaml", true).unwrap(),
            OutputFormat::Yaml
        );
    }
}
