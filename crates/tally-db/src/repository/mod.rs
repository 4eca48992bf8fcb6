//! # Repository Module
//!
//! SQLite implementations of the storage traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  QuotationLifecycle                                                    │
//! │       │                                                                 │
//! │       │  store.fetch(&id)                                              │
//! │       ▼                                                                 │
//! │  QuotationRepository (impl QuotationStore)                             │
//! │  ├── create / update / fetch / list                                    │
//! │  ├── image_urls / set_image_urls                                       │
//! │  └── delete                                                            │
//! │       │                                                                 │
//! │       │  SQL + mapper                                                  │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`QuotationRepository`](quotation::QuotationRepository) - Quotation records

pub mod quotation;
