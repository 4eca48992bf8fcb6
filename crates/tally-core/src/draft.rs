//! # Item Draft
//!
//! State of the item entry form: the SKU being typed, box counts per size,
//! and the manual-rate toggle. Applies the size-entry policy live as the
//! SKU changes, then hands off to the line item builder.

use crate::catalog::Catalog;
use crate::error::{CoreResult, ValidationError};
use crate::line_item::{build_from_catalog, ItemEntry, LineItem};
use crate::money::Money;
use crate::sizes::{is_oversized, offered_sizes, Size, SizeSet};

/// Item entry form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    sku: String,
    sizes: SizeSet,
    manual: bool,
    manual_rate: Option<Money>,
    editing: Option<LineItem>,
}

impl ItemDraft {
    pub fn new() -> Self {
        ItemDraft::default()
    }

    /// Pre-fills the form from an existing item so it can be edited.
    ///
    /// The item is remembered: its pack size and MRP stand in when the
    /// catalog no longer knows the SKU.
    pub fn from_item(item: &LineItem) -> Self {
        let manual_rate = item.rate().is_positive().then_some(item.rate());
        ItemDraft {
            sku: item.description().to_string(),
            sizes: item.sizes().clone(),
            manual: item.is_manual_rate(),
            manual_rate,
            editing: Some(item.clone()),
        }
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn sizes(&self) -> &SizeSet {
        &self.sizes
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn is_oversized(&self) -> bool {
        is_oversized(&self.sku)
    }

    pub fn offered_sizes(&self) -> &'static [Size] {
        offered_sizes(&self.sku)
    }

    /// Updates the SKU text. Boxes entered for sizes the new SKU does not
    /// come in are cleared.
    pub fn set_sku(&mut self, sku: &str) {
        self.sku = sku.to_string();
        self.sizes.retain(offered_sizes(&self.sku));
    }

    /// Sets the box count for one size.
    ///
    /// ## Errors
    /// `SizeNotOffered` when the current SKU does not come in `size`.
    pub fn set_boxes(&mut self, size: Size, boxes: u32) -> Result<(), ValidationError> {
        if !self.offered_sizes().contains(&size) {
            return Err(ValidationError::SizeNotOffered {
                size: size.label().to_string(),
                sku: self.sku.trim().to_uppercase(),
            });
        }
        self.sizes.set(size, boxes);
        Ok(())
    }

    /// Drops every box count, keeping the SKU and pricing mode.
    pub fn clear_boxes(&mut self) {
        self.sizes = SizeSet::new();
    }

    /// Toggles manual pricing. Turning it off discards the typed rate.
    pub fn set_manual(&mut self, manual: bool) {
        self.manual = manual;
        if !manual {
            self.manual_rate = None;
        }
    }

    pub fn set_manual_rate(&mut self, rate: Option<Money>) {
        self.manual_rate = rate;
    }

    /// The entry as it would be handed to the builder.
    pub fn entry(&self) -> ItemEntry {
        ItemEntry {
            sku: self.sku.clone(),
            sizes: self.sizes.clone(),
            manual: self.manual,
            manual_rate: if self.manual { self.manual_rate } else { None },
        }
    }

    /// Builds the line item against the current catalog.
    pub fn build(&self, catalog: &Catalog) -> CoreResult<LineItem> {
        build_from_catalog(catalog, &self.entry(), self.editing.as_ref())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
