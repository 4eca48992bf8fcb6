//! # Commands Module
//!
//! The operations a front end invokes. Each takes the [`AppState`] it
//! needs and returns `Result<T, ApiError>`.
//!
//! ## Command Organization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Categories                                   │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Catalog      │  │   Quotation     │  │        Picker           │ │
//! │  │  ─────────────  │  │  ─────────────  │  │  ─────────────────────  │ │
//! │  │  refresh        │  │  add_*_item     │  │  open_picker            │ │
//! │  │  suggest_skus   │  │  update / del   │  │  search_picker          │ │
//! │  │                 │  │  discounts      │  │  delete_from_picker     │ │
//! │  │                 │  │  images         │  │                         │ │
//! │  │                 │  │  save / load    │  │                         │ │
//! │  │                 │  │  export         │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Import: JSON draft file → quotation commands → save            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`AppState`]: crate::state::AppState

pub mod catalog;
pub mod import;
pub mod picker;
pub mod quotation;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tally_db::{Database, DbConfig, FsBlobStore};

    use crate::config::DocumentSettings;
    use crate::lifecycle::QuotationLifecycle;
    use crate::state::catalog::tests::FakeSource;
    use crate::state::{AppState, CatalogCache};

    /// App state over an in-memory database, a temp blob dir and a fixed
    /// catalog.
    pub(crate) async fn app_state(dir: &std::path::Path) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let blobs = Arc::new(FsBlobStore::new(dir.join("blobs"), "http://files"));
        let source = Arc::new(FakeSource::new(&[
            ("ABC", 1000, 6),
            ("TEE BIG SIZE", 800, 4),
            ("NOPRICE", 0, 2),
        ]));

        AppState::new(
            CatalogCache::new(source),
            QuotationLifecycle::new(Arc::new(db.quotations()), blobs),
            DocumentSettings {
                output_dir: dir.join("out"),
            },
        )
    }
}
