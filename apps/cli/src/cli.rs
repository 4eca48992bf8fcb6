//! # Command Line
//!
//! ```text
//! tally [--config FILE] <command>
//!
//!   catalog refresh              fetch the SKU table, print the count
//!   catalog suggest <query>      SKU autosuggest over the fetched table
//!   list [--search S] [--page N] picker page of saved quotations
//!   show <id>                    one saved quotation with totals
//!   import <draft.json>          build + save a quotation from a draft
//!   edit <id> <draft.json>       apply a draft to a saved quotation
//!   export <id>                  write the printable document
//!   delete <id>                  remove a quotation and its images
//! ```
//!
//! Results go to stdout as pretty JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::commands::{catalog, import, picker, quotation};
use crate::document::JsonRenderer;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "tally", about = "Wholesale quotation builder", version)]
pub struct Cli {
    /// Config file (default: the platform config dir's tally.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// List saved quotations, newest first
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        page: Option<usize>,
    },

    /// Show a saved quotation
    Show { id: String },

    /// Build and save a quotation from a JSON draft file
    Import { path: PathBuf },

    /// Apply a JSON draft's edits to a saved quotation and save it again
    Edit { id: String, path: PathBuf },

    /// Export a saved quotation's printable document
    Export { id: String },

    /// Delete a saved quotation and release its payment images
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Fetch the SKU table again
    Refresh,
    /// Suggest SKU codes containing the query
    Suggest { query: String },
}

#[derive(Debug, Serialize)]
struct Refreshed {
    skus: usize,
}

#[derive(Debug, Serialize)]
struct Exported {
    path: PathBuf,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("Failed to encode output: {}", e)))
}

async fn read_draft(path: &Path) -> Result<import::DraftFile, ApiError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiError::validation(format!("Cannot read {}: {}", path.display(), e)))?;
    import::DraftFile::from_json(&text)
}

/// Runs one command and returns its JSON output.
pub async fn dispatch(state: &AppState, command: Command) -> Result<String, ApiError> {
    match command {
        Command::Catalog(CatalogCommand::Refresh) => {
            let skus = catalog::refresh_catalog(state).await?;
            to_json(&Refreshed { skus })
        }
        Command::Catalog(CatalogCommand::Suggest { query }) => {
            state.catalog.load(false).await?;
            to_json(&catalog::suggest_skus(state, &query))
        }
        Command::List { search, page } => {
            picker::open_picker(state).await?;
            to_json(&picker::search_picker(state, &search, page).await)
        }
        Command::Show { id } => to_json(&quotation::load_quotation(state, &id).await?),
        Command::Import { path } => {
            let draft = read_draft(&path).await?;
            to_json(&import::import_draft(state, &draft).await?)
        }
        Command::Edit { id, path } => {
            let draft = read_draft(&path).await?;
            to_json(&import::edit_saved(state, &id, &draft).await?)
        }
        Command::Export { id } => {
            quotation::load_quotation(state, &id).await?;
            let path = quotation::export_quotation(state, &JsonRenderer).await?;
            to_json(&Exported { path })
        }
        Command::Delete { id } => {
            picker::open_picker(state).await?;
            to_json(&picker::delete_from_picker(state, &id).await?)
        }
    }
}
