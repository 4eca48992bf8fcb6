//! # State Module
//!
//! Focused state types, each with a single responsibility, bundled into
//! [`AppState`] by the composition root.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐   │
//! │  │  CatalogCache    │ │ QuotationSession │ │  QuotationPicker     │   │
//! │  │                  │ │                  │ │                      │   │
//! │  │  RwLock<Arc<     │ │  Mutex<Quotation>│ │  Mutex<Picker>       │   │
//! │  │    Catalog>>     │ │  + busy flag     │ │  search + page       │   │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  QuotationLifecycle  (Arc<dyn QuotationStore>, Arc<dyn BlobStore>)│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • CatalogCache: whole-table swaps, readers never see a partial table  │
//! │  • QuotationSession: one async operation at a time (BUSY otherwise)    │
//! │  • QuotationLifecycle: stateless, the stores are Send + Sync           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
mod picker;
mod session;

use tokio::sync::Mutex;

pub use catalog::{
    source_from_settings, CatalogCache, CatalogError, CatalogSource, HttpCatalogSource, UnconfiguredSource,
};
pub use picker::{PendingRemoval, QuotationPicker, PAGE_SIZE};
pub use session::{BusyGuard, QuotationSession};

use crate::config::DocumentSettings;
use crate::lifecycle::QuotationLifecycle;

/// Everything a command may need.
#[derive(Debug)]
pub struct AppState {
    pub catalog: CatalogCache,
    pub session: QuotationSession,
    pub picker: Mutex<QuotationPicker>,
    pub lifecycle: QuotationLifecycle,
    pub documents: DocumentSettings,
}

impl AppState {
    pub fn new(catalog: CatalogCache, lifecycle: QuotationLifecycle, documents: DocumentSettings) -> Self {
        AppState {
            catalog,
            session: QuotationSession::new(),
            picker: Mutex::new(QuotationPicker::default()),
            lifecycle,
            documents,
        }
    }
}
