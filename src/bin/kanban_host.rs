//! Headless host for the board backend.
//!
//! Speaks newline-delimited JSON over stdin/stdout; see `kanban_lib::bridge`.
//! All tracing output goes to stderr so stdout stays a clean protocol channel.

use std::path::PathBuf;

use kanban_lib::bridge::runStdioBridge;
use kanban_lib::storage::{defaultAppRoot, initStorage};

/// Overrides the application data root
const DATA_DIR_ENV: &str = "KANBAN_DATA_DIR";

#[tokio::main]
async fn main() -> kanban_lib::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(defaultAppRoot);
    tracing::info!("{} {} starting, root {}", kanban_lib::APP_NAME, kanban_lib::APP_VERSION, root.display());

    let storage = initStorage(root)?;

    runStdioBridge(storage).await.map_err(|e| {
        tracing::error!(error = %e, "kanban-host exited with error");
        e
    })?;

    tracing::info!("kanban-host shut down cleanly");
    Ok(())
}
