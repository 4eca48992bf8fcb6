//! # Storage Seams
//!
//! The quotation store and the blob store as traits, so the lifecycle
//! service can run against SQLite + the filesystem in production and
//! against failure-injecting fakes in tests.
//!
//! ```text
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ QuotationStore           │         │ BlobStore                │
//! │  create / update         │         │  upload(id, image) → url │
//! │  fetch / list            │         │  remove(urls)            │
//! │  image_urls              │         │  download(url) → bytes   │
//! │  set_image_urls          │         │                          │
//! │  delete                  │         │                          │
//! └────────────▲─────────────┘         └────────────▲─────────────┘
//!              │                                    │
//!      QuotationRepository                     FsBlobStore
//! ```

use async_trait::async_trait;
use tally_core::{EncodedImage, Quotation, QuotationSummary};

use crate::error::{BlobResult, DbResult};

/// CRUD over stored quotations.
#[async_trait]
pub trait QuotationStore: Send + Sync {
    /// Inserts a new record. The store assigns id, number and creation
    /// time; the stored record is returned.
    async fn create(&self, quotation: &Quotation) -> DbResult<Quotation>;

    /// Overwrites an existing record and stamps `updated_at`.
    ///
    /// ## Errors
    /// `NotFound` when the id no longer exists.
    async fn update(&self, quotation: &Quotation) -> DbResult<Quotation>;

    async fn fetch(&self, id: &str) -> DbResult<Quotation>;

    /// All records, newest first.
    async fn list(&self) -> DbResult<Vec<QuotationSummary>>;

    /// The payment-image URLs of one record.
    async fn image_urls(&self, id: &str) -> DbResult<Vec<String>>;

    /// Replaces the payment-image URLs without touching `updated_at`.
    async fn set_image_urls(&self, id: &str, urls: &[String]) -> DbResult<()>;

    /// Deletes a record. Returns false when there was nothing to delete.
    async fn delete(&self, id: &str) -> DbResult<bool>;
}

/// Storage for payment-proof images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores an image under the quotation's id and returns its public URL.
    async fn upload(&self, quotation_id: &str, image: &EncodedImage) -> BlobResult<String>;

    /// Removes the blobs behind the given URLs. Already-missing blobs are
    /// not an error.
    async fn remove(&self, urls: &[String]) -> BlobResult<()>;

    async fn download(&self, url: &str) -> BlobResult<Vec<u8>>;
}
