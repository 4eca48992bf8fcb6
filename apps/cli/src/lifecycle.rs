//! # Quotation Record Lifecycle
//!
//! Save / load / list / delete over the quotation store and the blob store.
//!
//! ## Save
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate_for_save()        ── blocked? nothing is written          │
//! │  2. id? update() : create()    ── row is the commit point              │
//! │  3. upload each Encoded image  ── failure: image stays Encoded         │
//! │     under the quotation id        (unsent), save still succeeds        │
//! │  4. set_image_urls()           ── row now lists every stored URL       │
//! │  5. merge: Stored{url, cached} keeps the pixel data for rendering      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delete
//! ```text
//! image_urls(id) ──► delete(id) ──► blobs.remove(urls)
//!                        │                 │
//!                   Err: row stays    Err: row stays deleted,
//!                   (caller rolls     orphaned blobs logged and
//!                    back its list)   reported, never retried
//! ```

use std::sync::Arc;

use serde::Serialize;
use tally_core::validation::validate_uuid;
use tally_core::{CoreError, PaymentImage, Quotation, QuotationSummary, SaveBlocker, ValidationError};
use tally_db::{BlobError, BlobStore, DbError, QuotationStore};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The quotation or the request itself is not acceptable.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The quotation store failed; in-memory state must stay untouched.
    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

impl From<SaveBlocker> for LifecycleError {
    fn from(blocker: SaveBlocker) -> Self {
        LifecycleError::Validation(CoreError::SaveBlocked(blocker))
    }
}

impl From<ValidationError> for LifecycleError {
    fn from(err: ValidationError) -> Self {
        LifecycleError::Validation(CoreError::Validation(err))
    }
}

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The stored record, with payment images merged back in.
    pub quotation: Quotation,
    pub is_resave: bool,
    /// Images uploaded by this save.
    pub uploaded: usize,
    /// Images that failed to upload and are still held locally.
    pub unsent: usize,
}

/// What happened to the blobs of a deleted quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlobCleanup {
    Released,
    NothingToRelease,
    /// Row deleted, blobs orphaned.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub id: String,
    pub released_urls: Vec<String>,
    pub cleanup: BlobCleanup,
}

/// Stateless service over the two stores.
#[derive(Clone)]
pub struct QuotationLifecycle {
    store: Arc<dyn QuotationStore>,
    blobs: Arc<dyn BlobStore>,
}

impl QuotationLifecycle {
    pub fn new(store: Arc<dyn QuotationStore>, blobs: Arc<dyn BlobStore>) -> Self {
        QuotationLifecycle { store, blobs }
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Creates or updates the record, then uploads unsent images.
    pub async fn save(&self, quotation: &Quotation) -> Result<SaveOutcome, LifecycleError> {
        quotation.validate_for_save()?;

        let is_resave = quotation.is_saved();
        let mut saved = if is_resave {
            self.store.update(quotation).await?
        } else {
            self.store.create(quotation).await?
        };
        let id = saved
            .id
            .clone()
            .ok_or_else(|| DbError::Internal("store returned a record without id".into()))?;

        let (images, uploaded, unsent) = self.upload_images(&id, quotation.payment_images()).await;
        saved.set_payment_images(images)?;

        info!(
            id = %id,
            quotation_no = saved.quotation_no.as_deref().unwrap_or_default(),
            is_resave,
            uploaded,
            unsent,
            "Quotation saved"
        );

        Ok(SaveOutcome {
            quotation: saved,
            is_resave,
            uploaded,
            unsent,
        })
    }

    /// Uploads the Encoded images and records the URL list on the row.
    /// Returns the merged image list plus uploaded/unsent counts.
    async fn upload_images(&self, id: &str, images: &[PaymentImage]) -> (Vec<PaymentImage>, usize, usize) {
        let mut merged = Vec::with_capacity(images.len());
        let mut fresh_urls = Vec::new();
        let mut unsent = 0;

        for image in images {
            match image {
                PaymentImage::Stored { .. } => merged.push(image.clone()),
                PaymentImage::Encoded(encoded) => match self.blobs.upload(id, encoded).await {
                    Ok(url) => {
                        fresh_urls.push(url.clone());
                        merged.push(PaymentImage::Stored {
                            url,
                            cached: Some(encoded.clone()),
                        });
                    }
                    Err(e) => {
                        warn!(id = %id, error = %e, "Payment image upload failed; kept locally");
                        unsent += 1;
                        merged.push(image.clone());
                    }
                },
            }
        }

        if fresh_urls.is_empty() {
            return (merged, 0, unsent);
        }

        let urls: Vec<String> = merged
            .iter()
            .filter_map(|image| image.url().map(str::to_string))
            .collect();

        match self.store.set_image_urls(id, &urls).await {
            Ok(()) => (merged, fresh_urls.len(), unsent),
            Err(e) => {
                // The row does not reference the new blobs; release them and
                // keep every new image as unsent.
                warn!(id = %id, error = %e, "Recording payment image URLs failed");
                if let Err(e) = self.blobs.remove(&fresh_urls).await {
                    warn!(id = %id, error = %e, "Releasing unreferenced payment images failed");
                }
                let reverted = images.to_vec();
                let unsent = reverted.iter().filter(|image| image.is_unsent()).count();
                (reverted, 0, unsent)
            }
        }
    }

    pub async fn load(&self, id: &str) -> Result<Quotation, LifecycleError> {
        validate_uuid(id)?;
        debug!(id = %id, "Loading quotation");
        Ok(self.store.fetch(id).await?)
    }

    /// Summaries, newest first.
    pub async fn list(&self) -> Result<Vec<QuotationSummary>, LifecycleError> {
        Ok(self.store.list().await?)
    }

    /// Deletes the row, then releases its blobs.
    ///
    /// ## Errors
    /// Only row-level failures are errors. Blob release failure is
    /// reported in [`DeletionReport::cleanup`].
    pub async fn delete(&self, id: &str) -> Result<DeletionReport, LifecycleError> {
        validate_uuid(id)?;

        let urls = self.store.image_urls(id).await?;
        if !self.store.delete(id).await? {
            return Err(DbError::not_found("Quotation", id).into());
        }
        info!(id = %id, images = urls.len(), "Quotation deleted");

        let cleanup = if urls.is_empty() {
            BlobCleanup::NothingToRelease
        } else {
            match self.blobs.remove(&urls).await {
                Ok(()) => BlobCleanup::Released,
                Err(e) => {
                    warn!(id = %id, error = %e, orphaned = urls.len(), "Payment image cleanup failed");
                    BlobCleanup::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        Ok(DeletionReport {
            id: id.to_string(),
            released_urls: urls,
            cleanup,
        })
    }
}

impl std::fmt::Debug for QuotationLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotationLifecycle").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use tally_core::{build_sample, EncodedImage, Money};
    use tally_db::{BlobResult, Database, DbConfig, FsBlobStore};

    /// Blob store whose every call fails.
    pub(crate) struct BrokenBlobs;

    #[async_trait]
    impl BlobStore for BrokenBlobs {
        async fn upload(&self, _: &str, _: &EncodedImage) -> BlobResult<String> {
            Err(BlobError::Unavailable("bucket offline".into()))
        }

        async fn remove(&self, _: &[String]) -> BlobResult<()> {
            Err(BlobError::Unavailable("bucket offline".into()))
        }

        async fn download(&self, url: &str) -> BlobResult<Vec<u8>> {
            Err(BlobError::NotFound(url.to_string()))
        }
    }

    pub(crate) async fn lifecycle_with(blobs: Arc<dyn BlobStore>) -> QuotationLifecycle {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        QuotationLifecycle::new(Arc::new(db.quotations()), blobs)
    }

    pub(crate) fn png(seed: u8) -> EncodedImage {
        EncodedImage::new("image/png", vec![0x89, b'P', b'N', b'G', seed])
    }

    pub(crate) fn ready(party: &str) -> Quotation {
        let mut q = Quotation::new();
        q.party = party.to_string();
        q.add_item(build_sample("Cap", 2, Money::from_major(40)).unwrap());
        q
    }

    #[tokio::test]
    async fn test_save_creates_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with(Arc::new(FsBlobStore::new(dir.path(), "http://files"))).await;

        let mut q = ready("Acme");
        q.add_image(png(1)).unwrap();

        let outcome = lifecycle.save(&q).await.unwrap();
        assert!(!outcome.is_resave);
        assert_eq!(outcome.uploaded, 1);
        assert_eq!(outcome.unsent, 0);

        let image = &outcome.quotation.payment_images()[0];
        assert!(image.url().unwrap().starts_with("http://files/payment-images/"));
        assert_eq!(image.local(), Some(&png(1)));

        let id = outcome.quotation.id.clone().unwrap();
        let reloaded = lifecycle.load(&id).await.unwrap();
        assert_eq!(reloaded.payment_images().len(), 1);
        assert_eq!(reloaded.payment_images()[0].url(), image.url());
    }

    #[tokio::test]
    async fn test_blocked_save_writes_nothing() {
        let lifecycle = lifecycle_with(Arc::new(BrokenBlobs)).await;

        let err = lifecycle.save(&Quotation::new()).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Validation(CoreError::SaveBlocked(SaveBlocker::MissingParty))
        ));
        assert!(lifecycle.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_image_unsent() {
        let lifecycle = lifecycle_with(Arc::new(BrokenBlobs)).await;

        let mut q = ready("Acme");
        q.add_image(png(7)).unwrap();

        let outcome = lifecycle.save(&q).await.unwrap();
        assert_eq!(outcome.uploaded, 0);
        assert_eq!(outcome.unsent, 1);
        assert!(outcome.quotation.payment_images()[0].is_unsent());
        assert!(outcome.quotation.is_saved());
    }

    #[tokio::test]
    async fn test_resave_updates() {
        let lifecycle = lifecycle_with(Arc::new(BrokenBlobs)).await;

        let first = lifecycle.save(&ready("Acme")).await.unwrap().quotation;
        let mut edited = first.clone();
        edited.remark = "second pass".into();

        let outcome = lifecycle.save(&edited).await.unwrap();
        assert!(outcome.is_resave);
        assert_eq!(outcome.quotation.id, first.id);
        assert_eq!(outcome.quotation.remark, "second pass");
        assert!(outcome.quotation.updated_at.is_some());
        assert_eq!(lifecycle.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_releases_images() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FsBlobStore::new(dir.path(), "http://files"));
        let lifecycle = lifecycle_with(blobs.clone()).await;

        let mut q = ready("Acme");
        q.add_image(png(1)).unwrap();
        q.add_image(png(2)).unwrap();
        let saved = lifecycle.save(&q).await.unwrap().quotation;
        let id = saved.id.clone().unwrap();

        let report = lifecycle.delete(&id).await.unwrap();
        assert_eq!(report.released_urls.len(), 2);
        assert_eq!(report.cleanup, BlobCleanup::Released);
        assert!(blobs.download(&report.released_urls[0]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_survives_blob_failure() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: Arc<dyn QuotationStore> = Arc::new(db.quotations());

        // Save with working blobs, delete with broken ones.
        let saving = QuotationLifecycle::new(store.clone(), Arc::new(FsBlobStore::new(dir.path(), "http://files")));
        let mut q = ready("Acme");
        q.add_image(png(1)).unwrap();
        q.add_image(png(2)).unwrap();
        let id = saving.save(&q).await.unwrap().quotation.id.unwrap();

        let deleting = QuotationLifecycle::new(store, Arc::new(BrokenBlobs));
        let report = deleting.delete(&id).await.unwrap();

        assert_eq!(report.released_urls.len(), 2);
        assert!(matches!(report.cleanup, BlobCleanup::Failed { .. }));
        match deleting.load(&id).await.unwrap_err() {
            LifecycleError::Store(e) => assert!(e.is_not_found()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_is_store_error() {
        let lifecycle = lifecycle_with(Arc::new(BrokenBlobs)).await;
        let id = "6f1c2a44-3b1d-4a0e-9d55-0f1a2b3c4d5e";

        assert!(matches!(
            lifecycle.delete(id).await,
            Err(LifecycleError::Store(DbError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_id() {
        let lifecycle = lifecycle_with(Arc::new(BrokenBlobs)).await;
        assert!(matches!(
            lifecycle.load("not-a-uuid").await,
            Err(LifecycleError::Validation(CoreError::Validation(_)))
        ));
    }
}
