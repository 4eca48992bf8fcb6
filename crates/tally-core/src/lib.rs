//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of the quotation builder. It turns raw item
//! entries (SKU, box counts per size) into priced line items and keeps a
//! quotation consistent as discounts and edits change. Zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Composition root (apps/cli)                     │   │
//! │  │   catalog cache ──► session ──► lifecycle ──► document export   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌──────────────┐  │   │
//! │  │   │  sizes  │  │ catalog  │  │ line_item │  │   pricing    │  │   │
//! │  │   │ SizeSet │  │ Catalog  │  │ LineItem  │  │ apply_auto_  │  │   │
//! │  │   │  Size   │  │  Entry   │  │ ItemDraft │  │    rates     │  │   │
//! │  │   └─────────┘  └──────────┘  └───────────┘  └──────────────┘  │   │
//! │  │                    ┌────────────────────┐                      │   │
//! │  │                    │     quotation      │                      │   │
//! │  │                    │ Quotation, Totals  │                      │   │
//! │  │                    └────────────────────┘                      │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-db (Storage Layer)                        │   │
//! │  │        quotation rows, row mapper, payment-image blobs          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sizes`] - Size labels and the per-size box-count set
//! - [`catalog`] - SKU price sheet (unit price + pack size)
//! - [`line_item`] - Priced line items and the item builder
//! - [`draft`] - Item entry form state (oversized-SKU size policy)
//! - [`pricing`] - The auto-rate engine
//! - [`quotation`] - The quotation aggregate and its totals
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::{Catalog, CatalogEntry, ItemEntry, Money, Quotation, SizeSet};
//!
//! let catalog = Catalog::from_entries([(
//!     "ABC".to_string(),
//!     CatalogEntry::new(Money::from_major(1000), 6),
//! )]);
//!
//! let entry = ItemEntry::auto("abc", SizeSet::parse("M-2"));
//! let item = tally_core::build_from_catalog(&catalog, &entry, None).unwrap();
//!
//! let mut quotation = Quotation::new();
//! quotation.add_item(item);
//!
//! // 1000 at 57% off = 430 per piece, 12 pieces
//! assert_eq!(quotation.items()[0].rate(), Money::from_major(430));
//! assert_eq!(quotation.totals().total_amount, Money::from_major(5160));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod draft;
pub mod error;
pub mod line_item;
pub mod money;
pub mod pricing;
pub mod quotation;
pub mod sizes;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{Catalog, CatalogEntry};
pub use draft::ItemDraft;
pub use error::{CoreError, CoreResult, SaveBlocker, ValidationError};
pub use line_item::{build_from_catalog, build_sample, ItemEntry, LineItem, RestoredLineItem};
pub use money::Money;
pub use pricing::{apply_auto_rates, auto_rate, with_auto_rates, Discounts};
pub use quotation::{
    EncodedImage, PaymentImage, Quotation, QuotationParts, QuotationSummary, Totals,
};
pub use sizes::{Size, SizeSet};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Rate-discount tiers a quotation may use.
pub const ALLOWED_RATE_DISCOUNTS: [u8; 2] = [55, 57];

/// Rate-discount tier of a brand new quotation.
pub const DEFAULT_RATE_DISCOUNT: u8 = 57;

/// Upper bound of the secondary (special price) discount, in percent.
pub const MAX_SP_DISCOUNT: u8 = 10;

/// Maximum payment-proof images attached to one quotation.
pub const MAX_PAYMENT_IMAGES: usize = 2;

/// Number of SKU codes returned by an autosuggest query.
pub const SUGGESTION_LIMIT: usize = 8;

/// Serialized size field of items without a size breakdown (samples).
pub const NO_SIZES: &str = "-";
