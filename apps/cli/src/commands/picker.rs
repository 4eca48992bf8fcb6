//! # Picker Commands
//!
//! ## Optimistic Delete
//! ```text
//! delete_from_picker(id)
//!     │
//!     ├── picker.remove_optimistically(id)     list shrinks immediately
//!     │
//!     ├── lifecycle.delete(id)
//!     │      ├── Err ──► picker.rollback(pending), error returned
//!     │      └── Ok(report)
//!     │             ├── cleanup Released / NothingToRelease
//!     │             └── cleanup Failed ──► row stays deleted, reported
//!     │
//!     └── session quotation was this record? ──► start a blank one
//! ```

use serde::Serialize;
use tally_core::QuotationSummary;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::lifecycle::{BlobCleanup, DeletionReport};
use crate::state::{AppState, QuotationPicker};

/// One page of the picker.
#[derive(Debug, Clone, Serialize)]
pub struct PickerPage {
    pub search: String,
    pub page: usize,
    pub total_pages: usize,
    pub matches: usize,
    pub entries: Vec<QuotationSummary>,
}

impl From<&QuotationPicker> for PickerPage {
    fn from(picker: &QuotationPicker) -> Self {
        PickerPage {
            search: picker.search().to_string(),
            page: picker.page(),
            total_pages: picker.total_pages(),
            matches: picker.filtered().len(),
            entries: picker.visible().into_iter().cloned().collect(),
        }
    }
}

/// Fetches the saved quotations (newest first) into the picker.
pub async fn open_picker(state: &AppState) -> Result<PickerPage, ApiError> {
    let summaries = {
        let _guard = state.session.begin()?;
        state.lifecycle.list().await?
    };
    debug!(count = summaries.len(), "open_picker command");

    let mut picker = state.picker.lock().await;
    picker.reload(summaries);
    Ok(PickerPage::from(&*picker))
}

/// Applies a search (back to page 1) and then moves to `page` if given.
pub async fn search_picker(state: &AppState, search: &str, page: Option<usize>) -> PickerPage {
    let mut picker = state.picker.lock().await;
    if picker.search() != search {
        picker.set_search(search);
    }
    if let Some(page) = page {
        picker.set_page(page);
    }
    PickerPage::from(&*picker)
}

pub async fn delete_from_picker(state: &AppState, id: &str) -> Result<DeletionReport, ApiError> {
    let guard = state.session.begin()?;

    let pending = state.picker.lock().await.remove_optimistically(id);

    let report = match state.lifecycle.delete(id).await {
        Ok(report) => report,
        Err(e) => {
            if let Some(pending) = pending {
                warn!(id = %pending.id(), "Delete failed, restoring picker list");
                state.picker.lock().await.rollback(pending);
            }
            return Err(e.into());
        }
    };

    if let BlobCleanup::Failed { reason } = &report.cleanup {
        warn!(id = %id, reason = %reason, "Quotation deleted but its images were not released");
    }

    // The open quotation no longer exists; a re-save would fail.
    let open_id = state.session.snapshot().await.id;
    if open_id.as_deref() == Some(id) {
        drop(guard);
        state.session.new_quotation().await?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::quotation::{add_payment_image, add_sample_item, save_quotation};
    use crate::commands::test_support::app_state;
    use tally_core::Money;

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    async fn save_one(state: &AppState, party: &str) -> String {
        state.session.new_quotation().await.unwrap();
        state.session.edit(|q| q.party = party.into()).await.unwrap();
        add_sample_item(state, "Cap", 1, Money::from_major(10)).await.unwrap();
        save_quotation(state).await.unwrap().view.quotation.id.unwrap()
    }

    #[tokio::test]
    async fn test_open_and_search() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;
        save_one(&state, "Acme").await;
        save_one(&state, "Globex").await;

        let page = open_picker(&state).await.unwrap();
        assert_eq!(page.matches, 2);
        assert_eq!(page.entries[0].party, "Globex");

        let page = search_picker(&state, "acm", None).await;
        assert_eq!(page.matches, 1);
        assert_eq!(page.page, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;

        state.session.edit(|q| q.party = "Acme".into()).await.unwrap();
        add_sample_item(&state, "Cap", 1, Money::from_major(10)).await.unwrap();
        add_payment_image(&state, PNG_DATA_URL).await.unwrap();
        let id = save_quotation(&state).await.unwrap().view.quotation.id.unwrap();
        open_picker(&state).await.unwrap();

        let report = delete_from_picker(&state, &id).await.unwrap();
        assert_eq!(report.released_urls.len(), 1);
        assert_eq!(report.cleanup, BlobCleanup::Released);

        assert_eq!(state.picker.lock().await.len(), 0);
        // The deleted record was open; the session starts over.
        assert!(state.session.snapshot().await.id.is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;
        let id = save_one(&state, "Acme").await;
        open_picker(&state).await.unwrap();

        // Delete the row behind the picker's back; the picker delete then
        // fails with NotFound and must restore its list.
        state.lifecycle.delete(&id).await.unwrap();
        let err = delete_from_picker(&state, &id).await.unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
        assert_eq!(state.picker.lock().await.len(), 1);
    }
}
