//! # Sizes
//!
//! Size labels and the per-size box-count set entered for each item.
//!
//! ## Serialized Form
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "S-5, M-3"  ◄──── format ────  { S: 5, M: 3 }                          │
//! │       │                              ▲                                  │
//! │       └──────────── parse ───────────┘                                  │
//! │                                                                         │
//! │  ""  or  "-"   ──► {}   (sample items carry no size breakdown)          │
//! │  "S-x, M"      ──► {}   (bad counts are zero, never an error)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Oversized SKUs (names carrying a `BIG SIZE` marker) only come in the
//! large sizes; everything else is offered in the full range.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::NO_SIZES;

// =============================================================================
// Size
// =============================================================================

/// A garment size label.
///
/// Declaration order is display and print order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Size {
    S,
    M,
    L,
    XL,
    #[serde(rename = "2XL")]
    TwoXl,
    #[serde(rename = "3XL")]
    ThreeXl,
    #[serde(rename = "4XL")]
    FourXl,
}

impl Size {
    /// Every size, in print order.
    pub const ALL: [Size; 7] = [
        Size::S,
        Size::M,
        Size::L,
        Size::XL,
        Size::TwoXl,
        Size::ThreeXl,
        Size::FourXl,
    ];

    /// Sizes offered for regular SKUs only.
    pub const STANDARD: [Size; 5] = [Size::S, Size::M, Size::L, Size::XL, Size::TwoXl];

    /// The only sizes offered for oversized SKUs.
    pub const LARGE: [Size; 2] = [Size::ThreeXl, Size::FourXl];

    pub const fn label(&self) -> &'static str {
        match self {
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::XL => "XL",
            Size::TwoXl => "2XL",
            Size::ThreeXl => "3XL",
            Size::FourXl => "4XL",
        }
    }

    pub const fn is_large(&self) -> bool {
        matches!(self, Size::ThreeXl | Size::FourXl)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Size {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Size::ALL
            .into_iter()
            .find(|size| size.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "size".to_string(),
                reason: format!("unknown size label '{}'", wanted),
            })
    }
}

// =============================================================================
// Oversized Predicate
// =============================================================================

/// Returns true when the SKU names an oversized product.
///
/// ```rust
/// use tally_core::sizes::is_oversized;
///
/// assert!(is_oversized("polo big size"));
/// assert!(is_oversized("POLO-BIGSIZE"));
/// assert!(!is_oversized("POLO"));
/// ```
pub fn is_oversized(sku: &str) -> bool {
    let upper = sku.to_uppercase();
    upper.contains("BIG SIZE") || upper.contains("BIGSIZE")
}

/// Sizes a box count may be entered for, given the SKU being typed.
pub fn offered_sizes(sku: &str) -> &'static [Size] {
    if is_oversized(sku) {
        &Size::LARGE
    } else {
        &Size::ALL
    }
}

// =============================================================================
// SizeSet
// =============================================================================

/// Box counts per size. Absent sizes count as zero; zero counts are never
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeSet(BTreeMap<Size, u32>);

impl SizeSet {
    pub fn new() -> Self {
        SizeSet(BTreeMap::new())
    }

    /// Parses the serialized `LABEL-count` list.
    ///
    /// Never fails: unknown labels are skipped, segments without a usable
    /// count contribute zero, and a repeated label keeps its last count.
    ///
    /// ```rust
    /// use tally_core::{Size, SizeSet};
    ///
    /// let set = SizeSet::parse("S-5, M-3");
    /// assert_eq!(set.get(Size::S), 5);
    /// assert_eq!(set.total_boxes(), 8);
    ///
    /// assert!(SizeSet::parse("-").is_empty());
    /// assert!(SizeSet::parse("S").is_empty());
    /// ```
    pub fn parse(input: &str) -> SizeSet {
        let mut set = SizeSet::new();
        let input = input.trim();
        if input.is_empty() || input == NO_SIZES {
            return set;
        }

        for segment in input.split(',') {
            let mut parts = segment.trim().splitn(2, '-');
            let label = parts.next().unwrap_or_default();
            let count = parts.next().map(parse_count).unwrap_or(0);

            if let Ok(size) = label.parse::<Size>() {
                set.set(size, count);
            }
        }
        set
    }

    /// Box count for one size (zero when absent).
    pub fn get(&self, size: Size) -> u32 {
        self.0.get(&size).copied().unwrap_or(0)
    }

    /// Sets a box count; zero removes the size.
    pub fn set(&mut self, size: Size, count: u32) {
        if count == 0 {
            self.0.remove(&size);
        } else {
            self.0.insert(size, count);
        }
    }

    /// Seven `u32` counts always fit a `u64` sum.
    pub fn total_boxes(&self) -> u64 {
        self.0.values().map(|count| u64::from(*count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-zero entries in size order.
    pub fn iter(&self) -> impl Iterator<Item = (Size, u32)> + '_ {
        self.0.iter().map(|(size, count)| (*size, *count))
    }

    /// Drops every size not in `allowed`.
    pub fn retain(&mut self, allowed: &[Size]) {
        self.0.retain(|size, _| allowed.contains(size));
    }

    /// Formats entries in the caller's order as `LABEL-count` joined by `", "`.
    ///
    /// With `only_non_zero` false, sizes listed in `order` but absent from
    /// the set are emitted as `LABEL-0`.
    pub fn format(&self, order: &[Size], only_non_zero: bool) -> String {
        order
            .iter()
            .map(|size| (*size, self.get(*size)))
            .filter(|(_, count)| !only_non_zero || *count > 0)
            .map(|(size, count)| format!("{}-{}", size.label(), count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Display uses print order and hides zero counts; an empty set renders as
/// the empty string.
impl fmt::Display for SizeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&Size::ALL, true))
    }
}

impl FromIterator<(Size, u32)> for SizeSet {
    fn from_iter<I: IntoIterator<Item = (Size, u32)>>(iter: I) -> Self {
        let mut set = SizeSet::new();
        for (size, count) in iter {
            set.set(size, count);
        }
        set
    }
}

impl Serialize for SizeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SizeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SizeSet::parse(&raw))
    }
}

/// Parse then sum, for edit previews.
pub fn total_boxes(input: &str) -> u64 {
    SizeSet::parse(input).total_boxes()
}

/// Lenient count coercion shared with the catalog sheet parser.
///
/// Whole numbers parse directly; decimals truncate; anything else
/// (including negatives) is zero.
pub(crate) fn parse_count(raw: &str) -> u32 {
    let raw = raw.trim();
    if let Ok(count) = raw.parse::<u32>() {
        return count;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let set = SizeSet::parse("S-5, M-3");
        assert_eq!(set.get(Size::S), 5);
        assert_eq!(set.get(Size::M), 3);
        assert_eq!(set.get(Size::L), 0);
        assert_eq!(total_boxes("S-5, M-3"), 8);
    }

    #[test]
    fn test_parse_empty_and_sentinel() {
        assert!(SizeSet::parse("").is_empty());
        assert!(SizeSet::parse("   ").is_empty());
        assert!(SizeSet::parse("-").is_empty());
        assert_eq!(total_boxes("-"), 0);
    }

    #[test]
    fn test_parse_malformed_segments_count_zero() {
        let set = SizeSet::parse("S, M-abc, L-2, XXL-4, ");
        assert_eq!(set.get(Size::S), 0);
        assert_eq!(set.get(Size::M), 0);
        assert_eq!(set.get(Size::L), 2);
        assert_eq!(set.total_boxes(), 2);
    }

    #[test]
    fn test_parse_numeric_labels_and_case() {
        let set = SizeSet::parse("2xl-1,3XL-2 , 4XL-3");
        assert_eq!(set.get(Size::TwoXl), 1);
        assert_eq!(set.get(Size::ThreeXl), 2);
        assert_eq!(set.get(Size::FourXl), 3);
    }

    #[test]
    fn test_total_boxes_beyond_u32() {
        assert_eq!(total_boxes("S-4294967295, M-1"), 4_294_967_296);

        let set = SizeSet::parse("S-4294967295, M-4294967295, L-4294967295");
        assert_eq!(set.total_boxes(), 3 * u64::from(u32::MAX));
    }

    #[test]
    fn test_parse_count_coercion() {
        assert_eq!(parse_count("7"), 7);
        assert_eq!(parse_count(" 2.9 "), 2);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("NaN"), 0);
    }

    #[test]
    fn test_format_order_and_zeroes() {
        let set: SizeSet = [(Size::M, 3), (Size::S, 5)].into_iter().collect();
        assert_eq!(set.to_string(), "S-5, M-3");
        assert_eq!(set.format(&[Size::M, Size::S], true), "M-3, S-5");
        assert_eq!(set.format(&[Size::S, Size::L], false), "S-5, L-0");
        assert_eq!(SizeSet::new().to_string(), "");
    }

    #[test]
    fn test_format_then_parse_keeps_entries() {
        let mut set = SizeSet::new();
        for (i, size) in Size::ALL.into_iter().enumerate() {
            set.set(size, (i as u32) * 3);
        }
        assert_eq!(SizeSet::parse(&set.to_string()), set);
    }

    #[test]
    fn test_set_zero_removes() {
        let mut set = SizeSet::parse("S-5");
        set.set(Size::S, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_oversized_policy() {
        assert!(is_oversized("tee big size"));
        assert!(is_oversized("TEE-BIGSIZE-RED"));
        assert!(!is_oversized("BIG TEE"));

        assert_eq!(offered_sizes("TEE BIG SIZE"), &Size::LARGE);
        assert_eq!(offered_sizes("TEE").len(), 7);

        let mut set = SizeSet::parse("S-2, 3XL-1, 4XL-2");
        set.retain(offered_sizes("TEE BIG SIZE"));
        assert_eq!(set.to_string(), "3XL-1, 4XL-2");
    }

    #[test]
    fn test_serde_as_string() {
        let set = SizeSet::parse("XL-4");
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "\"XL-4\"");
        let back: SizeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_size_from_str() {
        assert_eq!("xl".parse::<Size>().unwrap(), Size::XL);
        assert!("XXL".parse::<Size>().is_err());
        assert!(Size::FourXl.is_large());
        assert!(!Size::TwoXl.is_large());
    }
}
