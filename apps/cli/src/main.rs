//! # Tally Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            tally (binary)                               │
//! │                                                                         │
//! │  main.rs ────► tokio runtime, hands off to lib.rs                      │
//! │                                                                         │
//! │  lib.rs ─────► tracing, config, database, state, dispatch              │
//! │                                                                         │
//! │  cli.rs ─────► catalog / list / show / import / export / delete        │
//! │                                                                         │
//! │  commands/ ──► add_catalog_item, save_quotation, delete_from_picker    │
//! │                                                                         │
//! │  state/ ─────► CatalogCache, QuotationSession, QuotationPicker         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // The actual setup is in lib.rs for testability
    tally_cli_lib::run().await
}
