//! # API Error Type
//!
//! The single user-facing error of the app layer.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                  │
//! │                                                                         │
//! │  ValidationError / SaveBlocker / CoreError ──► VALIDATION_ERROR        │
//! │     user-fixable; operation aborted, nothing changed                    │
//! │                                                                         │
//! │  DbError / BlobError / RenderError ──────────► TRANSPORT_ERROR         │
//! │     store call failed; in-memory state left as it was                   │
//! │     (DbError::NotFound ──────────────────────► NOT_FOUND)              │
//! │                                                                         │
//! │  CatalogError ───────────────────────────────► CATALOG_UNAVAILABLE     │
//! │     non-fatal; previous catalog stays cached                            │
//! │                                                                         │
//! │  second operation while one is in flight ────► BUSY                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error serializes as:
//! ```json
//! { "code": "VALIDATION_ERROR", "title": "Missing Party Name",
//!   "message": "Party name is required to save quotation." }
//! ```

use serde::Serialize;
use tally_core::{CoreError, SaveBlocker, ValidationError};
use tally_db::{BlobError, DbError};

use crate::config::ConfigError;
use crate::document::RenderError;
use crate::lifecycle::LifecycleError;
use crate::state::CatalogError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Dialog title, when the error has a specific one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// User-fixable input problem
    ValidationError,

    /// Store, blob or document call failed
    TransportError,

    /// SKU catalog could not be fetched
    CatalogUnavailable,

    NotFound,

    /// Another operation is still in flight
    Busy,

    /// Configuration or programming error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            title: None,
            message: message.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn busy() -> Self {
        ApiError::new(
            ErrorCode::Busy,
            "Another operation is in progress. Please wait for it to finish.",
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<SaveBlocker> for ApiError {
    fn from(blocker: SaveBlocker) -> Self {
        ApiError::validation(blocker.to_string()).with_title(blocker.title())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::SaveBlocked(blocker) => blocker.into(),
            // Out-of-range indexes come from the caller, not the user.
            CoreError::ItemIndexOutOfRange { .. } | CoreError::ImageIndexOutOfRange { .. } => {
                tracing::error!("Index error: {}", err);
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::TransportError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InvalidRecord { id, reason } => {
                tracing::error!(id = %id, reason = %reason, "Stored quotation is unreadable");
                ApiError::new(
                    ErrorCode::TransportError,
                    format!("Quotation {} could not be read", id),
                )
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Quotation store failed: {}", other);
                ApiError::new(ErrorCode::TransportError, "Quotation store operation failed")
            }
        }
    }
}

impl From<BlobError> for ApiError {
    fn from(err: BlobError) -> Self {
        tracing::error!("Blob store failed: {}", err);
        ApiError::new(ErrorCode::TransportError, format!("Image storage failed: {}", err))
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotConfigured => ApiError::internal(err.to_string()),
            CatalogError::Unavailable(_) => {
                ApiError::new(ErrorCode::CatalogUnavailable, err.to_string())
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(e) => e.into(),
            LifecycleError::Store(e) => e.into(),
            LifecycleError::Blob(e) => e.into(),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        tracing::error!("Document export failed: {}", err);
        ApiError::new(ErrorCode::TransportError, err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.title {
            Some(title) => write!(f, "[{:?}] {}: {}", self.code, title, self.message),
            None => write!(f, "[{:?}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_blocker_keeps_title() {
        let err = ApiError::from(SaveBlocker::MissingParty);
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.title.as_deref(), Some("Missing Party Name"));
        assert_eq!(err.message, "Party name is required to save quotation.");
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = ApiError::from(DbError::not_found("Quotation", "abc"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Quotation not found: abc");
    }

    #[test]
    fn test_catalog_failure_is_catalog_unavailable() {
        let err = ApiError::from(CatalogError::Unavailable("timeout".into()));
        assert_eq!(err.code, ErrorCode::CatalogUnavailable);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::busy()).unwrap();
        assert_eq!(json["code"], "BUSY");
        assert!(json.get("title").is_none());
    }
}
