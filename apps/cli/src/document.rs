//! # Document Export
//!
//! Turns a priced quotation into a printable document.
//!
//! ```text
//! Quotation ──► PrintableQuotation::prepare ──► DocumentRenderer ──► file
//!                 │                                 (layout engine)   │
//!                 ├── rows: DESC | S..4XL | PCS | RATE | AMOUNT |     │
//!                 │         MRP | PACKING                             │
//!                 ├── totals, total discount %                        ▼
//!                 └── images as raw bytes          <output_dir>/ACME_TRADERS.pdf
//!                      Encoded ─► bytes                         or ..._UPDATED.pdf
//!                      Stored + cache ─► cache
//!                      Stored ─► blobs.download (failure: skipped, logged)
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::{EncodedImage, Money, Quotation, Size, Totals};
use tally_db::BlobStore;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Document renderer failed: {0}")]
    Renderer(String),
}

/// Box columns of the item table, left to right.
pub const SIZE_COLUMNS: [Size; 7] = Size::ALL;

/// One line of the item table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintRow {
    pub description: String,
    /// Boxes per size, aligned with [`SIZE_COLUMNS`]; 0 prints blank.
    pub boxes: [u32; 7],
    pub pieces: i64,
    pub rate: Money,
    pub amount: Money,
    pub mrp: Money,
    pub packing: u32,
}

/// Everything a layout engine needs, with images already resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PrintableQuotation {
    pub quotation_no: Option<String>,
    pub party: String,
    pub phone: String,
    pub address: String,
    pub sales_person: String,
    pub remark: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub rows: Vec<PrintRow>,
    pub totals: Totals,
    pub total_discount_pct: u8,
    pub images: Vec<EncodedImage>,
    pub is_resave: bool,
}

impl PrintableQuotation {
    pub async fn prepare(quotation: &Quotation, blobs: &dyn BlobStore) -> Self {
        let rows = quotation
            .items()
            .iter()
            .map(|item| PrintRow {
                description: item.description().to_string(),
                boxes: SIZE_COLUMNS.map(|size| item.sizes().get(size)),
                pieces: item.piece_count(),
                rate: item.rate(),
                amount: item.amount(),
                mrp: item.unit_price_at_entry(),
                packing: item.pack_size(),
            })
            .collect();

        PrintableQuotation {
            quotation_no: quotation.quotation_no.clone(),
            party: quotation.party.clone(),
            phone: quotation.phone.clone(),
            address: quotation.address.clone(),
            sales_person: quotation.sales_person.clone(),
            remark: quotation.remark.clone(),
            created_at: quotation.created_at,
            updated_at: quotation.updated_at,
            rows,
            totals: quotation.totals(),
            total_discount_pct: quotation.rate_discount_pct() + quotation.sp_discount_pct(),
            images: resolve_images(quotation, blobs).await,
            is_resave: quotation.updated_at.is_some(),
        }
    }
}

async fn resolve_images(quotation: &Quotation, blobs: &dyn BlobStore) -> Vec<EncodedImage> {
    let mut images = Vec::with_capacity(quotation.payment_images().len());

    for image in quotation.payment_images() {
        if let Some(local) = image.local() {
            images.push(local.clone());
            continue;
        }
        let Some(url) = image.url() else { continue };

        match blobs.download(url).await {
            Ok(bytes) => images.push(EncodedImage::new(content_type_for(url), bytes)),
            Err(e) => warn!(url = %url, error = %e, "Payment image download failed; left out of document"),
        }
    }

    images
}

fn content_type_for(url: &str) -> &'static str {
    let ext = url.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Renderers
// =============================================================================

/// A layout engine that turns a prepared quotation into file bytes.
pub trait DocumentRenderer: Send + Sync {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, document: &PrintableQuotation) -> Result<Vec<u8>, RenderError>;
}

/// Writes the prepared document as pretty JSON, for layout engines that
/// run out of process.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, document: &PrintableQuotation) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec_pretty(document)?)
    }
}

/// `"  Acme  Traders & Co. "` → `ACME_TRADERS__CO`; empty → `QUOTATION`.
/// Re-saved records get an `_UPDATED` suffix.
pub fn document_file_name(party: &str, is_resave: bool, extension: &str) -> String {
    let mut base = String::with_capacity(party.len());
    let mut in_space = false;
    for c in party.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                base.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            base.push(c.to_ascii_uppercase());
        }
    }

    if base.is_empty() {
        base.push_str("QUOTATION");
    }
    if is_resave {
        base.push_str("_UPDATED");
    }
    format!("{}.{}", base, extension)
}

/// Prepares, renders and writes the document. Returns the file path.
pub async fn export_document(
    quotation: &Quotation,
    blobs: &dyn BlobStore,
    renderer: &dyn DocumentRenderer,
    output_dir: &Path,
) -> Result<PathBuf, RenderError> {
    let document = PrintableQuotation::prepare(quotation, blobs).await;
    debug!(rows = document.rows.len(), images = document.images.len(), "Document prepared");

    let bytes = renderer.render(&document)?;

    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(document_file_name(
        &document.party,
        document.is_resave,
        renderer.extension(),
    ));
    tokio::fs::write(&path, bytes).await?;

    info!(path = %path.display(), "Quotation document written");
    Ok(path)
}
