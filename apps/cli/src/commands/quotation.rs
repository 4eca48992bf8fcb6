//! # Quotation Commands
//!
//! Edits to the session quotation plus save / load / export.
//!
//! ## Quotation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Blank   │────►│ Editing  │────►│  Saved   │────►│ Exported │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │       ▲                │  ▲              │                              │
//! │       │          add_*_item│         save_quotation                     │
//! │  new_quotation   discounts │         (create / update)                  │
//! │                  images    └──────────────┘                             │
//! │                                                                         │
//! │  load_quotation ─────────────────────────► Saved                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edits are synchronous. save / load / export and the catalog fetch behind
//! item entry hold the session's busy flag, so a second one fails with
//! `BUSY` and a failed one leaves the session untouched.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tally_core::{Catalog, EncodedImage, ItemDraft, Money, Quotation, Totals};
use tracing::debug;

use crate::document::{export_document, DocumentRenderer};
use crate::error::ApiError;
use crate::state::AppState;

/// The quotation with its totals, as shown after every command.
#[derive(Debug, Clone, Serialize)]
pub struct QuotationView {
    pub quotation: Quotation,
    pub totals: Totals,
}

impl From<Quotation> for QuotationView {
    fn from(quotation: Quotation) -> Self {
        let totals = quotation.totals();
        QuotationView { quotation, totals }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    pub view: QuotationView,
    pub is_resave: bool,
    pub uploaded: usize,
    pub unsent: usize,
}

async fn view(state: &AppState) -> QuotationView {
    state.session.snapshot().await.into()
}

async fn catalog(state: &AppState) -> Result<Arc<Catalog>, ApiError> {
    let _guard = state.session.begin()?;
    Ok(state.catalog.load(false).await?)
}

// =============================================================================
// Items
// =============================================================================

/// Builds an item from the entry form and appends it.
pub async fn add_catalog_item(state: &AppState, draft: &ItemDraft) -> Result<QuotationView, ApiError> {
    debug!(sku = %draft.sku(), manual = draft.is_manual(), "add_catalog_item command");

    let catalog = catalog(state).await?;
    let item = draft.build(&catalog)?;
    state.session.edit(|q| q.add_item(item)).await?;

    Ok(view(state).await)
}

/// Rebuilds the item at `index` from an edit form (see
/// [`ItemDraft::from_item`]).
pub async fn update_catalog_item(
    state: &AppState,
    index: usize,
    draft: &ItemDraft,
) -> Result<QuotationView, ApiError> {
    debug!(index, sku = %draft.sku(), "update_catalog_item command");

    let catalog = catalog(state).await?;
    let item = draft.build(&catalog)?;
    state.session.edit(|q| q.update_item(index, item)).await??;

    Ok(view(state).await)
}

pub async fn add_sample_item(
    state: &AppState,
    name: &str,
    pieces: i64,
    rate: Money,
) -> Result<QuotationView, ApiError> {
    debug!(name = %name, pieces, "add_sample_item command");

    let item = tally_core::build_sample(name, pieces, rate)?;
    state.session.edit(|q| q.add_item(item)).await?;

    Ok(view(state).await)
}

pub async fn delete_item(state: &AppState, index: usize) -> Result<QuotationView, ApiError> {
    state.session.edit(|q| q.delete_item(index)).await??;
    Ok(view(state).await)
}

// =============================================================================
// Discounts and Adjustments
// =============================================================================

pub async fn set_rate_discount(state: &AppState, pct: u8) -> Result<QuotationView, ApiError> {
    state.session.edit(|q| q.set_rate_discount(pct)).await??;
    Ok(view(state).await)
}

/// Out-of-range values are clamped into 0..=10.
pub async fn set_sp_discount(state: &AppState, pct: i64) -> Result<QuotationView, ApiError> {
    let applied = state.session.edit(|q| q.set_sp_discount(pct)).await?;
    debug!(requested = pct, applied, "set_sp_discount command");
    Ok(view(state).await)
}

/// Bill discount, shipping and advance. `None` leaves a value unchanged.
pub async fn set_adjustments(
    state: &AppState,
    bill_discount: Option<Money>,
    shipping: Option<Money>,
    advance: Option<Money>,
) -> Result<QuotationView, ApiError> {
    state
        .session
        .edit(|q| {
            // Validate all three before applying any.
            let mut next = q.clone();
            if let Some(amount) = bill_discount {
                next.set_bill_discount(amount)?;
            }
            if let Some(amount) = shipping {
                next.set_shipping(amount)?;
            }
            if let Some(amount) = advance {
                next.set_advance(amount)?;
            }
            *q = next;
            Ok::<_, ApiError>(())
        })
        .await??;

    Ok(view(state).await)
}

// =============================================================================
// Payment Images
// =============================================================================

/// Attaches a `data:image/...;base64,` image. At most two per quotation.
pub async fn add_payment_image(state: &AppState, data_url: &str) -> Result<QuotationView, ApiError> {
    let image = EncodedImage::from_data_url(data_url)?;
    state.session.edit(|q| q.add_image(image)).await??;
    Ok(view(state).await)
}

/// Detaches an image locally. A stored blob is only released when the
/// whole quotation is deleted.
pub async fn remove_payment_image(state: &AppState, index: usize) -> Result<QuotationView, ApiError> {
    state.session.edit(|q| q.remove_image(index)).await??;
    Ok(view(state).await)
}

// =============================================================================
// Persistence
// =============================================================================

pub async fn save_quotation(state: &AppState) -> Result<SaveResponse, ApiError> {
    let _guard = state.session.begin()?;
    let current = state.session.snapshot().await;

    let outcome = state.lifecycle.save(&current).await?;
    state.session.replace(outcome.quotation.clone()).await;

    Ok(SaveResponse {
        view: outcome.quotation.into(),
        is_resave: outcome.is_resave,
        uploaded: outcome.uploaded,
        unsent: outcome.unsent,
    })
}

pub async fn load_quotation(state: &AppState, id: &str) -> Result<QuotationView, ApiError> {
    let _guard = state.session.begin()?;

    let loaded = state.lifecycle.load(id).await?;
    state.session.replace(loaded.clone()).await;

    Ok(loaded.into())
}

pub async fn new_quotation(state: &AppState) -> Result<QuotationView, ApiError> {
    state.session.new_quotation().await?;
    Ok(view(state).await)
}

/// Renders the session quotation into the configured output directory.
pub async fn export_quotation(
    state: &AppState,
    renderer: &dyn DocumentRenderer,
) -> Result<PathBuf, ApiError> {
    let _guard = state.session.begin()?;
    let current = state.session.snapshot().await;

    Ok(export_document(
        &current,
        state.lifecycle.blobs(),
        renderer,
        &state.documents.output_dir,
    )
    .await?)
}
