//! # Validation Module
//!
//! Business rule validation for quotation input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Item entry (ItemDraft)                                       │
//! │  ├── Size-entry policy (oversized SKUs)                                │
//! │  └── Immediate feedback while typing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Builders + aggregate setters                                 │
//! │  └── THIS MODULE: field rules, discount tiers, image limit             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Save gate                                                    │
//! │  └── check_save_ready: ordered MissingParty → NoItems → InvalidItems   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{SaveBlocker, ValidationError};
use crate::line_item::LineItem;
use crate::money::Money;
use crate::{ALLOWED_RATE_DISCOUNTS, MAX_PAYMENT_IMAGES, MAX_SP_DISCOUNT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU code and returns it normalised (trimmed, uppercased).
///
/// SKU codes may contain spaces (`"TEE BIG SIZE"`), so only emptiness and
/// length are checked.
///
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert_eq!(validate_sku(" tee-101 ").unwrap(), "TEE-101");
/// assert!(validate_sku("   ").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<String> {
    let sku = crate::catalog::normalize_sku(sku);

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 100,
        });
    }

    Ok(sku)
}

/// Validates the free-text name of a sample item.
pub fn validate_sample_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("sample name"));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "sample name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

pub fn validate_piece_count(pcs: i64) -> ValidationResult<()> {
    if pcs <= 0 {
        return Err(ValidationError::must_be_positive("pcs"));
    }
    Ok(())
}

pub fn validate_rate(rate: Money) -> ValidationResult<()> {
    if !rate.is_positive() {
        return Err(ValidationError::must_be_positive("rate"));
    }
    Ok(())
}

/// Validates a bill-level adjustment (bill discount, shipping, advance).
pub fn validate_adjustment(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Rate discount must be one of the configured tiers.
///
/// ```rust
/// use tally_core::validation::validate_rate_discount;
///
/// assert!(validate_rate_discount(57).is_ok());
/// assert!(validate_rate_discount(50).is_err());
/// ```
pub fn validate_rate_discount(pct: u8) -> ValidationResult<()> {
    if !ALLOWED_RATE_DISCOUNTS.contains(&pct) {
        return Err(ValidationError::NotAllowed {
            field: "rate discount".to_string(),
            allowed: ALLOWED_RATE_DISCOUNTS.iter().map(|p| p.to_string()).collect(),
        });
    }
    Ok(())
}

/// Rate discounts read back from storage only need to be a percentage.
pub fn validate_stored_rate_discount(pct: i64) -> ValidationResult<u8> {
    if !(0..=100).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "rate discount".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(pct as u8)
}

/// Clamps the secondary discount into `0..=MAX_SP_DISCOUNT`.
pub fn clamp_sp_discount(pct: i64) -> u8 {
    pct.clamp(0, i64::from(MAX_SP_DISCOUNT)) as u8
}

/// Validates that another payment image may be attached.
pub fn validate_image_count(current: usize) -> ValidationResult<()> {
    if current >= MAX_PAYMENT_IMAGES {
        return Err(ValidationError::ImageLimitExceeded {
            max: MAX_PAYMENT_IMAGES,
        });
    }
    Ok(())
}

// =============================================================================
// ID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Save Gate
// =============================================================================

/// Checks whether a quotation may be saved. Order matters: the party is
/// checked before the item list is even looked at.
pub fn check_save_ready(party: &str, items: &[LineItem]) -> Result<(), SaveBlocker> {
    if party.trim().is_empty() {
        return Err(SaveBlocker::MissingParty);
    }

    if items.is_empty() {
        return Err(SaveBlocker::NoItems);
    }

    if !items.iter().any(LineItem::is_billable) {
        return Err(SaveBlocker::InvalidItems);
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::build_sample;

    #[test]
    fn test_validate_sku() {
        assert_eq!(validate_sku("tee big size").unwrap(), "TEE BIG SIZE");
        assert!(validate_sku("").is_err());
        assert!(validate_sku(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_piece_count(1).is_ok());
        assert!(validate_piece_count(0).is_err());
        assert!(validate_rate(Money::from_minor(1)).is_ok());
        assert!(validate_rate(Money::zero()).is_err());
        assert!(validate_adjustment("shipping", Money::zero()).is_ok());
        assert!(matches!(
            validate_adjustment("shipping", Money::from_minor(-1)),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_rate_discount_tiers() {
        assert!(validate_rate_discount(55).is_ok());
        assert!(validate_rate_discount(57).is_ok());
        assert!(matches!(
            validate_rate_discount(60),
            Err(ValidationError::NotAllowed { .. })
        ));

        assert_eq!(validate_stored_rate_discount(50).unwrap(), 50);
        assert!(validate_stored_rate_discount(101).is_err());
        assert!(validate_stored_rate_discount(-1).is_err());
    }

    #[test]
    fn test_clamp_sp_discount() {
        assert_eq!(clamp_sp_discount(-5), 0);
        assert_eq!(clamp_sp_discount(7), 7);
        assert_eq!(clamp_sp_discount(25), 10);
    }

    #[test]
    fn test_image_count() {
        assert!(validate_image_count(0).is_ok());
        assert!(validate_image_count(1).is_ok());
        assert_eq!(
            validate_image_count(2),
            Err(ValidationError::ImageLimitExceeded { max: 2 })
        );
    }

    #[test]
    fn test_check_save_ready_order() {
        assert_eq!(check_save_ready("", &[]), Err(SaveBlocker::MissingParty));
        assert_eq!(check_save_ready("  ", &[]), Err(SaveBlocker::MissingParty));
        assert_eq!(check_save_ready("Acme", &[]), Err(SaveBlocker::NoItems));

        let sample = build_sample("Cap", 3, Money::from_major(50)).unwrap();
        assert_eq!(check_save_ready("Acme", &[sample]), Ok(()));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
