//! # Pricing Engine
//!
//! Derives the rate of every auto-priced item from its captured MRP and the
//! quotation's two discount knobs.
//!
//! ## The Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rate = round( MRP × (100 − rate%) / 100 × (100 − min(sp%, 10)) / 100 ) │
//! │                                                                         │
//! │  • rounded to the nearest WHOLE currency unit, half up                  │
//! │  • computed in one step on integer minor units (no float drift):        │
//! │      major = (mrp_minor × (100 − r) × (100 − s) + 500_000) / 1_000_000  │
//! │  • sp% = 0 multiplies by 100/100, so one formula covers both branches   │
//! │                                                                         │
//! │  Example: MRP 1000, 57% ⇒ 430;  then sp 10% ⇒ round(430 × 0.9) = 387   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only items that are neither samples nor manual, and whose MRP is known
//! (> 0), are touched. The engine is total and idempotent: running it twice
//! with the same discounts yields the same list.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::line_item::LineItem;
use crate::money::Money;
use crate::{DEFAULT_RATE_DISCOUNT, MAX_SP_DISCOUNT};

/// Minor units in one whole currency unit, times both percent scales.
const ROUNDING_DIVISOR: i128 = 100 * 100 * 100;

// =============================================================================
// Discounts
// =============================================================================

/// The bill-wide discount knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discounts {
    /// Base tier, percent off MRP.
    pub rate_discount_pct: u8,
    /// Secondary discount on top of the tier; anything above 10 counts as 10.
    pub sp_discount_pct: u8,
}

impl Discounts {
    pub fn new(rate_discount_pct: u8, sp_discount_pct: u8) -> Self {
        Discounts {
            rate_discount_pct,
            sp_discount_pct,
        }
    }
}

impl Default for Discounts {
    fn default() -> Self {
        Discounts::new(DEFAULT_RATE_DISCOUNT, 0)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Rate for one piece at the given MRP and discounts.
///
/// Returns zero for a non-positive MRP.
///
/// ```rust
/// use tally_core::{auto_rate, Discounts, Money};
///
/// let mrp = Money::from_major(1000);
/// assert_eq!(auto_rate(mrp, Discounts::new(57, 0)), Money::from_major(430));
/// assert_eq!(auto_rate(mrp, Discounts::new(57, 10)), Money::from_major(387));
/// ```
pub fn auto_rate(unit_price: Money, discounts: Discounts) -> Money {
    if !unit_price.is_positive() {
        return Money::zero();
    }

    let rate_factor = 100 - i128::from(discounts.rate_discount_pct.min(100));
    let sp_factor = 100 - i128::from(discounts.sp_discount_pct.min(MAX_SP_DISCOUNT));

    let scaled = i128::from(unit_price.minor()) * rate_factor * sp_factor;
    let major = (scaled + ROUNDING_DIVISOR / 2) / ROUNDING_DIVISOR;

    Money::from_major(major as i64)
}

/// Reprices every eligible item in place. Returns how many were priced.
pub fn apply_auto_rates(items: &mut [LineItem], discounts: Discounts) -> usize {
    let mut priced = 0;
    for item in items.iter_mut() {
        if item.is_auto_priced() && item.unit_price_at_entry().is_positive() {
            item.apply_rate(auto_rate(item.unit_price_at_entry(), discounts));
            priced += 1;
        }
    }
    priced
}

/// Pure form of [`apply_auto_rates`]: returns a repriced copy.
pub fn with_auto_rates(items: &[LineItem], discounts: Discounts) -> Vec<LineItem> {
    let mut repriced = items.to_vec();
    apply_auto_rates(&mut repriced, discounts);
    repriced
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogEntry};
    use crate::line_item::{build_from_catalog, build_sample, ItemEntry};
    use crate::sizes::SizeSet;
    use crate::ALLOWED_RATE_DISCOUNTS;

    fn auto_item(mrp_minor: i64, sizes: &str, pack: u32) -> LineItem {
        let catalog = Catalog::from_entries([(
            "SKU".to_string(),
            CatalogEntry::new(Money::from_minor(mrp_minor), pack),
        )]);
        build_from_catalog(&catalog, &ItemEntry::auto("SKU", SizeSet::parse(sizes)), None).unwrap()
    }

    /// Two-step reference: discount, then secondary discount, then round
    /// half up to whole units. Exact rational arithmetic via cross-multiplying.
    fn reference_rate(mrp_minor: i64, r: u8, s: u8) -> i64 {
        let numerator = i128::from(mrp_minor) * (100 - i128::from(r)) * (100 - i128::from(s));
        let denominator: i128 = 100 * 100 * 100;
        let whole = numerator / denominator;
        let remainder = numerator % denominator;
        let rounded = if remainder * 2 >= denominator { whole + 1 } else { whole };
        (rounded * 100) as i64
    }

    #[test]
    fn test_sample_scenario() {
        let mut items = vec![auto_item(100_000, "M-2", 6)];

        assert_eq!(apply_auto_rates(&mut items, Discounts::new(57, 0)), 1);
        assert_eq!(items[0].piece_count(), 12);
        assert_eq!(items[0].rate(), Money::from_major(430));
        assert_eq!(items[0].amount(), Money::from_major(5160));

        apply_auto_rates(&mut items, Discounts::new(57, 10));
        assert_eq!(items[0].rate(), Money::from_major(387));
        assert_eq!(items[0].amount(), Money::from_major(4644));
    }

    #[test]
    fn test_rate_matches_reference_for_all_discount_pairs() {
        let prices = [1, 99, 100, 12_345, 99_950, 100_000, 250_050, 1_234_567];
        for &mrp in &prices {
            for &r in &ALLOWED_RATE_DISCOUNTS {
                for s in 0..=MAX_SP_DISCOUNT {
                    let rate = auto_rate(Money::from_minor(mrp), Discounts::new(r, s));
                    assert_eq!(rate.minor(), reference_rate(mrp, r, s), "mrp={} r={} s={}", mrp, r, s);
                }
            }
        }
    }

    #[test]
    fn test_half_rounds_up() {
        // 150 × 0.43 = 64.5 → 65
        assert_eq!(auto_rate(Money::from_major(150), Discounts::new(57, 0)), Money::from_major(65));
        // 149 × 0.43 = 64.07 → 64
        assert_eq!(auto_rate(Money::from_major(149), Discounts::new(57, 0)), Money::from_major(64));
    }

    #[test]
    fn test_sp_discount_capped_at_ten() {
        let mrp = Money::from_major(1000);
        assert_eq!(
            auto_rate(mrp, Discounts::new(57, 40)),
            auto_rate(mrp, Discounts::new(57, 10))
        );
    }

    #[test]
    fn test_skips_manual_sample_and_unknown_mrp() {
        let catalog = Catalog::from_entries([("ABC".to_string(), CatalogEntry::new(Money::from_major(1000), 6))]);
        let manual = build_from_catalog(
            &catalog,
            &ItemEntry::manual("ABC", SizeSet::parse("S-1"), Money::from_major(999)),
            None,
        )
        .unwrap();
        let sample = build_sample("Cap", 2, Money::from_major(10)).unwrap();
        let unknown = auto_item(0, "S-1", 1);

        let mut items = vec![manual.clone(), sample.clone(), unknown.clone()];
        assert_eq!(apply_auto_rates(&mut items, Discounts::new(55, 5)), 0);
        assert_eq!(items, vec![manual, sample, unknown]);
        assert!(items[2].is_pending_price());
    }

    #[test]
    fn test_idempotent() {
        let items = vec![auto_item(100_000, "M-2", 6), auto_item(45_050, "S-3, L-1", 4)];
        for &r in &ALLOWED_RATE_DISCOUNTS {
            for s in 0..=MAX_SP_DISCOUNT {
                let once = with_auto_rates(&items, Discounts::new(r, s));
                let twice = with_auto_rates(&once, Discounts::new(r, s));
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_amount_invariant_after_repricing() {
        let mut items = vec![auto_item(45_050, "S-3, L-1", 4)];
        for s in [0, 3, 10] {
            apply_auto_rates(&mut items, Discounts::new(55, s));
            let item = &items[0];
            assert_eq!(item.amount(), item.rate() * item.piece_count());
        }
    }
}
