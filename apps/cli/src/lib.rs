//! # Tally CLI Library
//!
//! Composition root for the quotation builder. Everything a front end
//! needs lives here; `main.rs` only starts the runtime.
//!
//! ## Module Organization
//! ```text
//! tally_cli_lib/
//! ├── lib.rs          ◄─── You are here (startup & dispatch)
//! ├── cli.rs          ◄─── clap command line
//! ├── config.rs       ◄─── tally.toml + TALLY_* overrides
//! ├── lifecycle.rs    ◄─── save / load / list / delete over both stores
//! ├── document.rs     ◄─── printable projection + renderer seam
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState
//! │   ├── catalog.rs  ◄─── CatalogCache + catalog sources
//! │   ├── session.rs  ◄─── in-memory quotation + busy flag
//! │   └── picker.rs   ◄─── search / paging / optimistic delete
//! ├── commands/
//! │   ├── catalog.rs  ◄─── refresh / suggest
//! │   ├── quotation.rs◄─── item, discount, image, persistence commands
//! │   ├── picker.rs   ◄─── open / search / delete
//! │   └── import.rs   ◄─── JSON draft → new or edited quotation
//! └── error.rs        ◄─── ApiError for every command
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod state;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tally_db::{Database, DbConfig, FsBlobStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use error::ApiError;
use lifecycle::QuotationLifecycle;
use state::{source_from_settings, AppState, CatalogCache};

/// Parses the command line, builds the application state and runs one
/// command.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging ── stderr, RUST_LOG or info,tally=debug          │
/// │  2. Load Config ───────── defaults → tally.toml → TALLY_* → validate    │
/// │  3. Open Database ─────── SQLite (WAL), pending migrations              │
/// │  4. Build State ───────── blob store, catalog cache, lifecycle          │
/// │  5. Dispatch ──────────── JSON to stdout, ApiError JSON to stderr       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing();

    match run_command(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(code = ?err.code, "{}", err.message);
            match serde_json::to_string_pretty(&err) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: cli::Cli) -> Result<String, ApiError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let state = build_state(&config).await?;
    cli::dispatch(&state, cli.command).await
}

/// Wires the stores and the catalog source from configuration.
pub async fn build_state(config: &AppConfig) -> Result<AppState, ApiError> {
    info!(path = ?config.database.path, "Opening quotation database");
    let db = Database::new(
        DbConfig::new(config.database.path.clone()).max_connections(config.database.max_connections),
    )
    .await?;

    let blobs = Arc::new(FsBlobStore::new(
        config.blobs.root.clone(),
        config.blobs.base_url(),
    ));
    let catalog = CatalogCache::new(source_from_settings(&config.catalog)?);
    let lifecycle = QuotationLifecycle::new(Arc::new(db.quotations()), blobs);

    Ok(AppState::new(catalog, lifecycle, config.documents.clone()))
}

/// Initializes the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: info, debug for tally crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_state_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("tally.db");
        config.blobs.root = dir.path().join("blobs");
        config.documents.output_dir = dir.path().join("out");

        let state = build_state(&config).await.unwrap();

        assert!(state.lifecycle.list().await.unwrap().is_empty());
        assert!(dir.path().join("tally.db").exists());
    }
}
