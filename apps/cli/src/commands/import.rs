//! # Draft Import and Edit
//!
//! Applies a JSON draft to a quotation and saves it, going through the
//! same commands an interactive front end would.
//!
//! ```text
//! import_draft(draft)         new_quotation ──┐
//!                                              ├──► apply_draft ──► save_quotation
//! edit_saved(id, draft)   load_quotation(id) ──┘                   (create / update)
//! ```
//!
//! ## Draft Format
//! ```json
//! {
//!   "party": "Acme Traders",
//!   "phone": "98765 43210",
//!   "rate_discount": 57,
//!   "sp_discount": 5,
//!   "shipping": "150.00",
//!   "update_items": [ { "index": 0, "sizes": "S-1, M-4" } ],
//!   "remove_items": [2],
//!   "items": [
//!     { "kind": "catalog", "sku": "TEE-RED", "sizes": "S-2, M-3" },
//!     { "kind": "catalog", "sku": "CAP", "sizes": "M-1", "rate": 95 },
//!     { "kind": "sample", "name": "Swatch", "pcs": 2, "rate": 10 }
//!   ],
//!   "remove_images": [0],
//!   "images": ["data:image/png;base64,..."]
//! }
//! ```
//! Every key is optional. Money is either whole currency units (`95`) or a
//! decimal string (`"95.50"`). Indexes refer to the quotation as it was
//! before the draft: updates apply first, then removals, then new items.

use serde::Deserialize;
use tally_core::{ItemDraft, Money, SizeSet, ValidationError};
use tracing::{debug, info};

use super::quotation::{
    add_catalog_item, add_payment_image, add_sample_item, delete_item, load_quotation,
    new_quotation, remove_payment_image, save_quotation, set_adjustments, set_rate_discount,
    set_sp_discount, update_catalog_item, SaveResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

/// A money amount as written in a draft file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DraftMoney {
    Major(i64),
    Text(String),
}

impl DraftMoney {
    pub fn to_money(&self, field: &str) -> Result<Money, ValidationError> {
        let parsed = match self {
            DraftMoney::Major(major) => Money::checked_from_major(*major),
            DraftMoney::Text(text) => Money::parse(text),
        };
        parsed.ok_or_else(|| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not an amount", self),
        })
    }
}

impl std::fmt::Display for DraftMoney {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftMoney::Major(major) => write!(f, "{}", major),
            DraftMoney::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftItem {
    /// Priced from the catalog unless `rate` is given.
    Catalog {
        sku: String,
        sizes: String,
        #[serde(default)]
        rate: Option<DraftMoney>,
    },
    Sample {
        name: String,
        pcs: i64,
        rate: DraftMoney,
    },
}

/// Changes to an existing catalog item. Absent keys keep the item's value.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftItemUpdate {
    pub index: usize,
    /// Replaces every box count.
    #[serde(default)]
    pub sizes: Option<String>,
    /// Switches the item to this manual rate.
    #[serde(default)]
    pub rate: Option<DraftMoney>,
    /// `false` goes back to catalog pricing.
    #[serde(default)]
    pub manual: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftFile {
    pub party: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub sales_person: Option<String>,
    pub remark: Option<String>,
    pub rate_discount: Option<u8>,
    pub sp_discount: Option<i64>,
    pub bill_discount: Option<DraftMoney>,
    pub shipping: Option<DraftMoney>,
    pub advance: Option<DraftMoney>,
    pub update_items: Vec<DraftItemUpdate>,
    pub remove_items: Vec<usize>,
    pub items: Vec<DraftItem>,
    pub remove_images: Vec<usize>,
    /// `data:image/...;base64,` URLs
    pub images: Vec<String>,
}

impl DraftFile {
    pub fn from_json(text: &str) -> Result<Self, ApiError> {
        serde_json::from_str(text)
            .map_err(|e| ApiError::validation(format!("Draft file is not valid: {}", e)))
    }
}

fn set_sizes(draft: &mut ItemDraft, sizes: &str) -> Result<(), ApiError> {
    for (size, boxes) in SizeSet::parse(sizes).iter() {
        draft.set_boxes(size, boxes)?;
    }
    Ok(())
}

fn item_draft(sku: &str, sizes: &str, rate: Option<&DraftMoney>) -> Result<ItemDraft, ApiError> {
    let mut draft = ItemDraft::new();
    draft.set_sku(sku);
    set_sizes(&mut draft, sizes)?;
    if let Some(rate) = rate {
        draft.set_manual(true);
        draft.set_manual_rate(Some(rate.to_money("rate")?));
    }
    Ok(draft)
}

/// Indexes in descending order, duplicates dropped, all within `len`.
fn removal_order(indexes: &[usize], len: usize, what: &str) -> Result<Vec<usize>, ApiError> {
    let mut order = indexes.to_vec();
    order.sort_unstable_by(|a, b| b.cmp(a));
    order.dedup();
    if let Some(bad) = order.iter().find(|i| **i >= len) {
        return Err(ApiError::validation(format!(
            "No {} at index {} (quotation has {})",
            what, bad, len
        )));
    }
    Ok(order)
}

async fn update_item(state: &AppState, update: &DraftItemUpdate) -> Result<(), ApiError> {
    let current = state.session.snapshot().await;
    let item = current.items().get(update.index).ok_or_else(|| {
        ApiError::validation(format!(
            "No item at index {} (quotation has {})",
            update.index,
            current.items().len()
        ))
    })?;
    if item.is_sample() {
        return Err(ApiError::validation(
            "Sample items cannot be edited; remove and add them again",
        ));
    }

    let mut draft = ItemDraft::from_item(item);
    if let Some(sizes) = &update.sizes {
        draft.clear_boxes();
        set_sizes(&mut draft, sizes)?;
    }
    if let Some(manual) = update.manual {
        draft.set_manual(manual);
    }
    if let Some(rate) = &update.rate {
        draft.set_manual(true);
        draft.set_manual_rate(Some(rate.to_money("rate")?));
    }

    update_catalog_item(state, update.index, &draft).await?;
    Ok(())
}

/// Applies every part of the draft to the session quotation.
async fn apply_draft(state: &AppState, draft: &DraftFile) -> Result<(), ApiError> {
    state
        .session
        .edit(|q| {
            let fields = [
                (&mut q.party, &draft.party),
                (&mut q.phone, &draft.phone),
                (&mut q.address, &draft.address),
                (&mut q.sales_person, &draft.sales_person),
                (&mut q.remark, &draft.remark),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    *field = value.clone();
                }
            }
        })
        .await?;

    if let Some(pct) = draft.rate_discount {
        set_rate_discount(state, pct).await?;
    }
    if let Some(pct) = draft.sp_discount {
        set_sp_discount(state, pct).await?;
    }

    let money = |value: &Option<DraftMoney>, field: &str| {
        value.as_ref().map(|m| m.to_money(field)).transpose()
    };
    set_adjustments(
        state,
        money(&draft.bill_discount, "bill discount")?,
        money(&draft.shipping, "shipping")?,
        money(&draft.advance, "advance")?,
    )
    .await?;

    for update in &draft.update_items {
        update_item(state, update).await?;
    }

    let current = state.session.snapshot().await;
    for index in removal_order(&draft.remove_items, current.items().len(), "item")? {
        delete_item(state, index).await?;
    }

    for item in &draft.items {
        match item {
            DraftItem::Catalog { sku, sizes, rate } => {
                add_catalog_item(state, &item_draft(sku, sizes, rate.as_ref())?).await?;
            }
            DraftItem::Sample { name, pcs, rate } => {
                add_sample_item(state, name, *pcs, rate.to_money("rate")?).await?;
            }
        }
    }

    for index in removal_order(&draft.remove_images, current.payment_images().len(), "image")? {
        remove_payment_image(state, index).await?;
    }
    for image in &draft.images {
        add_payment_image(state, image).await?;
    }

    Ok(())
}

/// Replaces the session quotation with the draft and saves it as a new
/// record.
pub async fn import_draft(state: &AppState, draft: &DraftFile) -> Result<SaveResponse, ApiError> {
    new_quotation(state).await?;
    apply_draft(state, draft).await?;

    let saved = save_quotation(state).await?;
    info!(
        quotation_no = saved.view.quotation.quotation_no.as_deref().unwrap_or_default(),
        items = draft.items.len(),
        "Draft imported"
    );
    Ok(saved)
}

/// Loads a saved quotation, applies the draft and re-saves it.
pub async fn edit_saved(
    state: &AppState,
    id: &str,
    draft: &DraftFile,
) -> Result<SaveResponse, ApiError> {
    debug!(id = %id, "edit_saved command");
    load_quotation(state, id).await?;
    apply_draft(state, draft).await?;

    let saved = save_quotation(state).await?;
    info!(
        id = %id,
        updated = draft.update_items.len(),
        removed = draft.remove_items.len(),
        added = draft.items.len(),
        "Saved quotation edited"
    );
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::app_state;
    use crate::error::ErrorCode;

    const DRAFT: &str = r#"{
        "party": "Acme Traders",
        "sp_discount": 10,
        "shipping": "150.50",
        "items": [
            { "kind": "catalog", "sku": "abc", "sizes": "M-2" },
            { "kind": "catalog", "sku": "NOPRICE", "sizes": "S-1", "rate": 95 },
            { "kind": "sample", "name": "Swatch", "pcs": 2, "rate": 10 }
        ]
    }"#;

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_draft_money_forms() {
        assert_eq!(DraftMoney::Major(95).to_money("rate").unwrap(), Money::from_major(95));
        assert_eq!(
            DraftMoney::Text("95.50".into()).to_money("rate").unwrap(),
            Money::from_minor(9550)
        );
        assert!(DraftMoney::Text("lots".into()).to_money("rate").is_err());
        assert!(DraftMoney::Major(100_000_000_000_000_000).to_money("rate").is_err());
        assert!(DraftMoney::Text("99999999999999999999".into()).to_money("rate").is_err());
    }

    #[test]
    fn test_removal_order() {
        assert_eq!(removal_order(&[0, 2, 2, 1], 3, "item").unwrap(), vec![2, 1, 0]);
        let err = removal_order(&[3], 3, "item").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_import_rejects_oversized_amounts() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;

        let draft = DraftFile::from_json(
            r#"{ "party": "Acme", "items": [ { "kind": "sample", "name": "Cap", "pcs": 1, "rate": 100000000000000000 } ] }"#,
        )
        .unwrap();
        let err = import_draft(&state, &draft).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let draft = DraftFile::from_json(
            r#"{ "party": "Acme", "items": [ { "kind": "catalog", "sku": "ABC", "sizes": "S-4294967295, M-4294967295", "rate": 10000000000 } ] }"#,
        )
        .unwrap();
        let err = import_draft(&state, &draft).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(state.lifecycle.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_prices_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;

        let saved = import_draft(&state, &DraftFile::from_json(DRAFT).unwrap()).await.unwrap();
        let q = &saved.view.quotation;

        assert!(!saved.is_resave);
        assert!(q.quotation_no.is_some());
        assert_eq!(q.items().len(), 3);
        assert_eq!(q.items()[0].rate(), Money::from_major(387));
        assert_eq!(q.items()[1].rate(), Money::from_major(95));
        assert_eq!(q.items()[1].piece_count(), 2);
        assert!(q.items()[2].is_sample());
        assert_eq!(q.shipping(), Money::from_minor(15050));
    }

    #[tokio::test]
    async fn test_import_rejects_size_not_offered() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;

        let draft = DraftFile::from_json(
            r#"{ "party": "Acme", "items": [ { "kind": "catalog", "sku": "TEE BIG SIZE", "sizes": "S-1" } ] }"#,
        )
        .unwrap();
        let err = import_draft(&state, &draft).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(state.lifecycle.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_saved_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;
        let created = import_draft(&state, &DraftFile::from_json(DRAFT).unwrap()).await.unwrap();
        let id = created.view.quotation.id.clone().unwrap();

        let edit = DraftFile::from_json(
            r#"{
                "remark": "revised",
                "sp_discount": 0,
                "update_items": [
                    { "index": 0, "sizes": "L-1" },
                    { "index": 1, "manual": false }
                ],
                "remove_items": [2],
                "items": [ { "kind": "sample", "name": "Tag", "pcs": 1, "rate": 5 } ],
                "images": ["data:image/png;base64,iVBORw0KGgo="]
            }"#,
        )
        .unwrap();
        let saved = edit_saved(&state, &id, &edit).await.unwrap();
        let q = &saved.view.quotation;

        assert!(saved.is_resave);
        assert_eq!(q.id.as_deref(), Some(id.as_str()));
        assert_eq!(q.quotation_no, created.view.quotation.quotation_no);
        assert!(q.updated_at.is_some());
        assert_eq!(q.party, "Acme Traders");
        assert_eq!(q.remark, "revised");

        assert_eq!(q.items().len(), 3);
        assert_eq!(q.items()[0].piece_count(), 6);
        assert_eq!(q.items()[0].rate(), Money::from_major(430));
        // back on catalog pricing with no MRP: pending
        assert!(q.items()[1].is_pending_price());
        assert_eq!(q.items()[2].description(), "Tag (SAMPLE)");
        assert_eq!(q.payment_images().len(), 1);
        assert_eq!(saved.uploaded, 1);

        assert_eq!(state.lifecycle.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_removes_images_and_rejects_bad_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;
        let mut draft = DraftFile::from_json(DRAFT).unwrap();
        draft.images = vec![PNG_DATA_URL.to_string()];
        let id = import_draft(&state, &draft).await.unwrap().view.quotation.id.unwrap();

        let edit = DraftFile::from_json(r#"{ "remove_images": [0] }"#).unwrap();
        let saved = edit_saved(&state, &id, &edit).await.unwrap();
        assert!(saved.view.quotation.payment_images().is_empty());

        let bad = DraftFile::from_json(r#"{ "remove_items": [7] }"#).unwrap();
        assert_eq!(edit_saved(&state, &id, &bad).await.unwrap_err().code, ErrorCode::ValidationError);

        let sample = DraftFile::from_json(r#"{ "update_items": [ { "index": 2, "sizes": "M-1" } ] }"#).unwrap();
        assert_eq!(edit_saved(&state, &id, &sample).await.unwrap_err().code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_malformed_draft() {
        assert_eq!(DraftFile::from_json("{").unwrap_err().code, ErrorCode::ValidationError);
    }
}
