//! # Line Items
//!
//! The priced unit of a quotation, and the builder that turns an item entry
//! into one.
//!
//! ## Two-Phase Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ItemEntry (sku, boxes per size, manual?)                               │
//! │        │                                                                │
//! │        ▼  build_from_catalog                                            │
//! │  LineItem { pieces = boxes × pack size }                                │
//! │        │                                                                │
//! │        ├── manual ──► rate = typed rate, priced                         │
//! │        │                                                                │
//! │        └── auto ────► rate = 0, PENDING PRICE                           │
//! │                           │                                             │
//! │                           ▼  pricing::apply_auto_rates                  │
//! │                       rate = f(MRP, discounts), priced                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "What was ordered" (pieces) is fixed when the item is built; "what it
//! costs" (rate) is derived later from the quotation's discount state. A
//! pending auto item is never billable, so a zero rate can never sneak into
//! a saved quotation looking like a free item.

use serde::Serialize;
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::sizes::{offered_sizes, SizeSet};
use crate::validation::{validate_piece_count, validate_rate, validate_sample_name, validate_sku};
use crate::NO_SIZES;

// =============================================================================
// Line Item
// =============================================================================

/// A priced line of a quotation.
///
/// Fields are private so that `amount == piece_count × rate` holds after
/// every mutation: rate changes go through [`LineItem::apply_rate`], which
/// recomputes the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct LineItem {
    description: String,
    #[ts(type = "string")]
    sizes: SizeSet,
    piece_count: i64,
    pack_size: u32,
    rate: Money,
    amount: Money,
    unit_price_at_entry: Money,
    is_manual_rate: bool,
    is_sample: bool,
    priced: bool,
}

impl LineItem {
    /// Rebuilds an item from stored fields. The amount is always
    /// recomputed from pieces and rate.
    pub fn restore(stored: RestoredLineItem) -> LineItem {
        let is_sample = stored.is_sample;
        let is_manual_rate = stored.is_manual_rate || is_sample;
        let rate = if stored.rate.is_negative() {
            Money::zero()
        } else {
            stored.rate
        };
        let piece_count = stored.piece_count.max(0);

        LineItem {
            description: stored.description,
            sizes: stored.sizes,
            piece_count,
            pack_size: stored.pack_size.max(1),
            rate,
            amount: rate.multiply_quantity(piece_count),
            unit_price_at_entry: stored.unit_price_at_entry,
            is_manual_rate,
            is_sample,
            priced: stored.priced || is_manual_rate,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sizes(&self) -> &SizeSet {
        &self.sizes
    }

    /// Serialized size breakdown; `"-"` for items without one.
    pub fn size_label(&self) -> String {
        if self.sizes.is_empty() {
            NO_SIZES.to_string()
        } else {
            self.sizes.to_string()
        }
    }

    pub fn piece_count(&self) -> i64 {
        self.piece_count
    }

    pub fn pack_size(&self) -> u32 {
        self.pack_size
    }

    pub fn rate(&self) -> Money {
        self.rate
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn unit_price_at_entry(&self) -> Money {
        self.unit_price_at_entry
    }

    pub fn is_manual_rate(&self) -> bool {
        self.is_manual_rate
    }

    pub fn is_sample(&self) -> bool {
        self.is_sample
    }

    pub fn is_priced(&self) -> bool {
        self.priced
    }

    /// Rate derived by the pricing engine rather than typed by the user.
    pub fn is_auto_priced(&self) -> bool {
        !self.is_sample && !self.is_manual_rate
    }

    /// Auto item that has not received a rate yet (e.g. unknown MRP).
    pub fn is_pending_price(&self) -> bool {
        self.is_auto_priced() && !self.priced
    }

    /// Counts toward the save rule: description, pieces and a rate.
    pub fn is_billable(&self) -> bool {
        !self.description.trim().is_empty()
            && self.piece_count > 0
            && self.rate.is_positive()
    }

    pub(crate) fn apply_rate(&mut self, rate: Money) {
        self.rate = rate;
        self.amount = rate.multiply_quantity(self.piece_count);
        self.priced = true;
    }
}

/// Stored fields of a line item, as read back from persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredLineItem {
    pub description: String,
    pub sizes: SizeSet,
    pub piece_count: i64,
    pub pack_size: u32,
    pub rate: Money,
    pub unit_price_at_entry: Money,
    pub is_manual_rate: bool,
    pub is_sample: bool,
    pub priced: bool,
}

// =============================================================================
// Item Entry
// =============================================================================

/// What the user typed for a catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub sku: String,
    pub sizes: SizeSet,
    pub manual: bool,
    pub manual_rate: Option<Money>,
}

impl ItemEntry {
    /// An entry priced from the catalog.
    pub fn auto(sku: &str, sizes: SizeSet) -> Self {
        ItemEntry {
            sku: sku.to_string(),
            sizes,
            manual: false,
            manual_rate: None,
        }
    }

    /// An entry with a typed rate.
    pub fn manual(sku: &str, sizes: SizeSet, rate: Money) -> Self {
        ItemEntry {
            sku: sku.to_string(),
            sizes,
            manual: true,
            manual_rate: Some(rate),
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Builds a line item from a catalog entry.
///
/// When `editing` is given (the item being replaced), its pack size and MRP
/// fill in for a SKU the catalog has no usable value for, so re-saving an
/// edit never drifts to the defaults.
///
/// ## Errors
/// - `Required { sku }` - blank SKU
/// - `Required { sizes }` - no boxes in any offered size
/// - `Required { rate }` - manual entry without a positive rate
/// - `OutOfRange { pcs | amount }` - pieces or `rate × pieces` overflow
///
/// ```rust
/// use tally_core::{build_from_catalog, Catalog, CatalogEntry, ItemEntry, Money, SizeSet};
///
/// let catalog = Catalog::from_entries([(
///     "SKU1".to_string(),
///     CatalogEntry::new(Money::from_major(100), 12),
/// )]);
/// let item = build_from_catalog(&catalog, &ItemEntry::auto("sku1", SizeSet::parse("S-5")), None)
///     .unwrap();
/// assert_eq!(item.piece_count(), 60);
/// assert!(item.is_pending_price());
/// ```
pub fn build_from_catalog(
    catalog: &Catalog,
    entry: &ItemEntry,
    editing: Option<&LineItem>,
) -> CoreResult<LineItem> {
    let sku = validate_sku(&entry.sku)?;

    let mut sizes = entry.sizes.clone();
    sizes.retain(offered_sizes(&sku));
    if sizes.total_boxes() == 0 {
        return Err(ValidationError::required("sizes").into());
    }

    let manual_rate = if entry.manual {
        match entry.manual_rate {
            Some(rate) if rate.is_positive() => Some(rate),
            _ => return Err(ValidationError::required("rate").into()),
        }
    } else {
        None
    };

    let catalog_entry = catalog.get(&sku);
    let pack_size = catalog_entry
        .map(|e| e.pack_size)
        .filter(|p| *p > 0)
        .or_else(|| editing.map(LineItem::pack_size))
        .unwrap_or(1)
        .max(1);
    let unit_price_at_entry = catalog_entry
        .map(|e| e.unit_price)
        .filter(Money::is_positive)
        .or_else(|| editing.map(LineItem::unit_price_at_entry))
        .unwrap_or_default();

    let piece_count = checked_piece_count(sizes.total_boxes(), pack_size)?;
    // An auto rate never exceeds the MRP it is derived from.
    check_amount(manual_rate.unwrap_or(unit_price_at_entry), piece_count)?;

    let mut item = LineItem {
        description: sku,
        sizes,
        piece_count,
        pack_size,
        rate: Money::zero(),
        amount: Money::zero(),
        unit_price_at_entry,
        is_manual_rate: manual_rate.is_some(),
        is_sample: false,
        priced: false,
    };
    if let Some(rate) = manual_rate {
        item.apply_rate(rate);
    }

    Ok(item)
}

/// Builds a free/demo item. Always manual, one piece per box, no sizes.
pub fn build_sample(name: &str, piece_count: i64, rate: Money) -> CoreResult<LineItem> {
    validate_sample_name(name)?;
    validate_piece_count(piece_count)?;
    validate_rate(rate)?;
    check_amount(rate, piece_count)?;

    let mut item = LineItem {
        description: format!("{} (SAMPLE)", name.trim()),
        sizes: SizeSet::new(),
        piece_count,
        pack_size: 1,
        rate: Money::zero(),
        amount: Money::zero(),
        unit_price_at_entry: Money::zero(),
        is_manual_rate: true,
        is_sample: true,
        priced: false,
    };
    item.apply_rate(rate);
    Ok(item)
}

fn out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 1,
        max: i64::MAX,
    }
}

fn checked_piece_count(boxes: u64, pack_size: u32) -> Result<i64, ValidationError> {
    boxes
        .checked_mul(u64::from(pack_size))
        .and_then(|pcs| i64::try_from(pcs).ok())
        .ok_or_else(|| out_of_range("pcs"))
}

fn check_amount(rate: Money, piece_count: i64) -> Result<(), ValidationError> {
    rate.checked_multiply_quantity(piece_count)
        .map(|_| ())
        .ok_or_else(|| out_of_range("amount"))
}

// =============================================================================
// Unit Tests
// =============================================================================
