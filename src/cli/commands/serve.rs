//! Serve Command
//!
//! Run the HTTP API.
//!
//! Usage:
//!   kanban-estimator serve [--host 127.0.0.1] [--port 8080]

use std::path::Path;

use crate::cli::util::load_config;
use crate::server;
use crate::types::Result;

pub async fn run(database: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(database)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    server::serve(config).await
}
