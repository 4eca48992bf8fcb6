//! # tally-db: Storage Layer for Tally
//!
//! Persists quotations in SQLite and payment-proof images in a blob store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  QuotationLifecycle (apps/cli)                                         │
//! │       │                      │                                          │
//! │       ▼                      ▼                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ QuotationStore│    │    mapper     │    │  BlobStore   │  │   │
//! │  │   │   (trait)     │    │ row ⇄ domain  │    │   (trait)    │  │   │
//! │  │   │       ▲       │    │               │    │      ▲       │  │   │
//! │  │   │ Quotation-    │───►│ QuotationRow  │    │ FsBlobStore  │  │   │
//! │  │   │ Repository    │    │ ItemRecord    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          │                                         │           │   │
//! │  └──────────┼─────────────────────────────────────────┼───────────┘   │
//! │             ▼                                         ▼               │
//! │   SQLite (quotations table)            <root>/payment-images/<id>/...  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`mapper`] - The single place where persisted names meet domain names
//! - [`store`] - `QuotationStore` / `BlobStore` traits
//! - [`repository`] - SQLite implementation of `QuotationStore`
//! - [`blob`] - Filesystem implementation of `BlobStore`
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, QuotationStore};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//! let summaries = db.quotations().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod blob;
pub mod error;
pub mod mapper;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use blob::FsBlobStore;
pub use error::{BlobError, BlobResult, DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::quotation::QuotationRepository;
pub use store::{BlobStore, QuotationStore};

/// Path segment under which payment images live, both on disk and in URLs.
pub const PAYMENT_IMAGES_PREFIX: &str = "payment-images";
