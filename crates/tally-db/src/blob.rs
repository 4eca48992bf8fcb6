//! # Filesystem Blob Store
//!
//! Payment-proof images as plain files, addressed by public URL.
//!
//! ```text
//! upload("7f3c…", image/png)
//!     │
//!     ▼
//! key  = 7f3c…/1718000000000-a1b2c3d4.png
//! file = <root>/payment-images/<key>
//! url  = <public_base_url>/payment-images/<key>
//! ```
//!
//! `remove` and `download` map a URL back to its key by the last
//! `/payment-images/` segment, so URLs written under a different base URL
//! still resolve as long as the files are under the same root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tally_core::EncodedImage;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{BlobError, BlobResult};
use crate::store::BlobStore;
use crate::PAYMENT_IMAGES_PREFIX;

/// [`BlobStore`] backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        FsBlobStore {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(PAYMENT_IMAGES_PREFIX).join(key)
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, PAYMENT_IMAGES_PREFIX, key)
    }
}

/// Extracts the storage key from a payment-image URL.
pub fn key_from_url(url: &str) -> BlobResult<&str> {
    let marker = format!("/{}/", PAYMENT_IMAGES_PREFIX);
    let (_, key) = url
        .rsplit_once(marker.as_str())
        .ok_or_else(|| BlobError::InvalidUrl(url.to_string()))?;

    if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(BlobError::InvalidUrl(url.to_string()));
    }
    Ok(key)
}

fn check_quotation_id(id: &str) -> BlobResult<()> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(BlobError::InvalidUrl(format!("bad quotation id: {}", id)));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, quotation_id: &str, image: &EncodedImage) -> BlobResult<String> {
        check_quotation_id(quotation_id)?;

        let nonce = Uuid::new_v4().simple().to_string();
        let key = format!(
            "{}/{}-{}.{}",
            quotation_id,
            Utc::now().timestamp_millis(),
            &nonce[..8],
            image.extension()
        );
        let path = self.path_for(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, image.bytes()).await?;

        debug!(quotation_id = %quotation_id, key = %key, bytes = image.bytes().len(), "Stored payment image");
        Ok(self.url_for(&key))
    }

    async fn remove(&self, urls: &[String]) -> BlobResult<()> {
        for url in urls {
            let key = key_from_url(url)?;
            match tokio::fs::remove_file(self.path_for(key)).await {
                Ok(()) => debug!(key = %key, "Removed payment image"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(key = %key, "Payment image already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn download(&self, url: &str) -> BlobResult<Vec<u8>> {
        let key = key_from_url(url)?;
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(url.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
