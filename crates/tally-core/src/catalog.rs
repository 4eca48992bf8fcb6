//! # Catalog
//!
//! The SKU price sheet: unit price (MRP) and pack size per SKU code.
//!
//! The catalog is an immutable snapshot. Refreshing replaces the whole
//! table; entries are never patched in place. Loading and caching live in
//! the app layer; this module only parses and answers lookups.
//!
//! ## Sheet Export Format
//! ```text
//! sku,mrp,pcs            ◄── header row (ignored)
//! TEE-101,1000,6
//!   polo-22 ,450,        ◄── key trimmed + uppercased, pack size → 1
//! ,999,3                 ◄── blank SKU, skipped
//! CAP,abc,12             ◄── unit price → 0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::sizes::parse_count;

// =============================================================================
// Catalog Entry
// =============================================================================

/// Price sheet row for one SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogEntry {
    /// MRP per piece.
    pub unit_price: Money,
    /// Pieces per box (always at least 1).
    pub pack_size: u32,
}

impl CatalogEntry {
    pub fn new(unit_price: Money, pack_size: u32) -> Self {
        CatalogEntry {
            unit_price,
            pack_size: pack_size.max(1),
        }
    }
}

impl Default for CatalogEntry {
    fn default() -> Self {
        CatalogEntry {
            unit_price: Money::zero(),
            pack_size: 1,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// SKU code (uppercased) → entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog from `(sku, entry)` pairs, normalising keys.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, CatalogEntry)>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|(sku, entry)| {
                let key = normalize_sku(&sku);
                (!key.is_empty()).then_some((key, entry))
            })
            .collect();
        Catalog { entries }
    }

    /// Parses the bulk sheet export (`sku,mrp,pcs` with a header row).
    ///
    /// Rows are tolerated rather than rejected: blank SKUs are skipped, an
    /// unreadable price becomes 0 and an unreadable or zero pack size
    /// becomes 1. Only a structurally broken CSV stream is an error.
    pub fn from_csv(text: &str) -> Result<Self, ValidationError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut entries = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| ValidationError::InvalidFormat {
                field: "catalog".to_string(),
                reason: e.to_string(),
            })?;

            let key = normalize_sku(record.get(0).unwrap_or_default());
            if key.is_empty() {
                continue;
            }

            let unit_price = record
                .get(1)
                .and_then(Money::parse)
                .unwrap_or_default();
            let pack_size = record.get(2).map(parse_count).unwrap_or(0);

            entries.insert(key, CatalogEntry::new(unit_price, pack_size));
        }

        Ok(Catalog { entries })
    }

    /// Looks up a SKU, case- and whitespace-insensitively.
    pub fn get(&self, sku: &str) -> Option<&CatalogEntry> {
        self.entries.get(&normalize_sku(sku))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Autosuggest: SKU codes containing `query` (case-insensitive), in
    /// sorted order, at most `limit` of them. A blank query suggests nothing.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = normalize_sku(query);
        if needle.is_empty() {
            return Vec::new();
        }

        self.entries
            .keys()
            .filter(|key| key.contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Catalog keys are trimmed and uppercased.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
