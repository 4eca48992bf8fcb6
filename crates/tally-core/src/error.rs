//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - User-fixable input problems                    │
//! │  └── SaveBlocker      - Why a quotation cannot be saved yet            │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Quotation store failures                       │
//! │  └── BlobError        - Payment-image blob failures                    │
//! │                                                                         │
//! │  App errors (apps/cli)                                                 │
//! │  └── ApiError         - What the user sees (code + message)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LifecycleError → ApiError         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The quotation is not ready to be saved.
    #[error("Cannot save quotation: {0}")]
    SaveBlocked(#[from] SaveBlocker),

    /// An item index outside the item list.
    ///
    /// ## When This Occurs
    /// Only through a caller bug: the UI offers edit/delete for rows it shows.
    #[error("Item index {index} out of range (quotation has {len} items)")]
    ItemIndexOutOfRange { index: usize, len: usize },

    /// A payment image index outside the image list.
    #[error("Payment image index {index} out of range (quotation has {len} images)")]
    ImageIndexOutOfRange { index: usize, len: usize },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are user-fixable: the operation is aborted with no partial state
/// change and the message is shown in a blocking dialog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, malformed data URL).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Box count entered for a size the SKU does not come in.
    #[error("size {size} is not offered for {sku}")]
    SizeNotOffered { size: String, sku: String },

    /// Too many payment images.
    #[error("Maximum {max} payment images allowed")]
    ImageLimitExceeded { max: usize },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Save Blocker
// =============================================================================

/// Why a quotation cannot be saved.
///
/// Checks run in declaration order; the first failing one is reported, so an
/// empty quotation without a party reports `MissingParty`, never `NoItems`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaveBlocker {
    #[error("Party name is required to save quotation.")]
    MissingParty,

    #[error("Please add at least one item before saving.")]
    NoItems,

    #[error("Each item must have description, PCS and rate.")]
    InvalidItems,
}

impl SaveBlocker {
    /// Dialog title shown above the message.
    pub fn title(&self) -> &'static str {
        match self {
            SaveBlocker::MissingParty => "Missing Party Name",
            SaveBlocker::NoItems => "No Items Added",
            SaveBlocker::InvalidItems => "Invalid Items",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
