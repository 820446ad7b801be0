//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/kanban-estimator/config.toml)
//! 3. Project config (.kanban/config.toml)
//! 4. Environment variables (KANBAN_* prefix, `__` between sections)
//! 5. Provider variables (GEMINI_API_KEY, GEMINI_MODEL)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::constants::provider;
use crate::types::{AppError, Result};

const APP_DIR: &str = "kanban-estimator";
const PROJECT_DIR: &str = ".kanban";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load configuration from explicit global/project file locations
    pub fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // KANBAN_SERVER__PORT -> server.port
        figment = figment.merge(Env::prefixed("KANBAN_").split("__").lowercase(true));

        let mut config: Config = figment
            .extract()
            .map_err(|e| AppError::Config(format!("Configuration error: {}", e)))?;

        Self::apply_provider_env(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| AppError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Dedicated provider variables win over every file layer
    fn apply_provider_env(config: &mut Config) {
        if let Ok(key) = env::var(provider::API_KEY_ENV)
            && !key.trim().is_empty()
        {
            config.llm.api_key = Some(key);
        }

        if let Ok(model) = env::var(provider::MODEL_ENV)
            && !model.trim().is_empty()
        {
            config.llm.model = model;
        }
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/kanban-estimator/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join(APP_DIR))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(config: &Config, format: &str) -> Result<()> {
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(config)?),
            "yaml" => println!("{}", serde_yaml::to_string(config)?),
            _ => println!(
                "{}",
                toml::to_string_pretty(config).map_err(|e| AppError::Config(e.to_string()))?
            ),
        }

        if !config.llm.has_api_key() {
            println!(
                "# {} is not set: estimates will use fallback content",
                provider::API_KEY_ENV
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            AppError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, force)
    }

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(&Self::project_dir(), force)
    }

    fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default config content (TOML)
    fn default_config() -> String {
        format!(
            r#"# kanban-estimator configuration
# Project settings in .kanban/config.toml override the global file.
# The provider credential is read from {key_env}, never from this file.

version = "1.0"

[server]
host = "0.0.0.0"
port = 5000
cors_origins = []
request_timeout_secs = 30

[llm]
provider = "gemini"
model = "{model}"
timeout_secs = 15
deadline_secs = 25
temperature = 1.0
top_p = 0.95
top_k = 40
max_output_tokens = 2048

[retry]
max_attempts = 3
base_delay_ms = 2000

[database]
path = "kanban_tickets.db"
"#,
            key_env = provider::API_KEY_ENV,
            model = provider::DEFAULT_MODEL,
        )
    }
}
