//! # Quotation Picker
//!
//! Searchable, paginated list of saved quotations with optimistic delete.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  summaries (newest first)                                              │
//! │     │  search: substring of party or quotation_no, case-insensitive    │
//! │     ▼                                                                   │
//! │  filtered ──► pages of 10 ──► visible()                                │
//! │                                                                         │
//! │  remove_optimistically(id) ── list updated now, PendingRemoval kept    │
//! │     ├── row delete Ok  ──► drop the PendingRemoval                     │
//! │     └── row delete Err ──► rollback(pending) restores the list         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::QuotationSummary;

pub const PAGE_SIZE: usize = 10;

/// Snapshot taken before an optimistic removal.
#[derive(Debug, Clone)]
#[must_use = "a pending removal must be rolled back if the delete fails"]
pub struct PendingRemoval {
    id: String,
    previous: Vec<QuotationSummary>,
    page: usize,
}

impl PendingRemoval {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct QuotationPicker {
    all: Vec<QuotationSummary>,
    search: String,
    page: usize,
}

impl QuotationPicker {
    pub fn new(summaries: Vec<QuotationSummary>) -> Self {
        QuotationPicker {
            all: summaries,
            search: String::new(),
            page: 1,
        }
    }

    /// Replaces the list after a refetch, keeping the search.
    pub fn reload(&mut self, summaries: Vec<QuotationSummary>) {
        self.all = summaries;
        self.set_page(self.page);
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Changing the search always goes back to page 1.
    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.page = 1;
    }

    pub fn filtered(&self) -> Vec<&QuotationSummary> {
        let needle = self.search.trim().to_lowercase();
        self.all
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.party.to_lowercase().contains(&needle)
                    || s.quotation_no.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// At least 1, so an empty list still reads "page 1 / 1".
    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(PAGE_SIZE).max(1)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Moves to `page`, clamped to the available pages.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    pub fn visible(&self) -> Vec<&QuotationSummary> {
        self.filtered()
            .into_iter()
            .skip((self.page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Removes `id` from the list right away. `None` if it is not listed.
    pub fn remove_optimistically(&mut self, id: &str) -> Option<PendingRemoval> {
        if !self.all.iter().any(|s| s.id == id) {
            return None;
        }

        let pending = PendingRemoval {
            id: id.to_string(),
            previous: self.all.clone(),
            page: self.page,
        };
        self.all.retain(|s| s.id != id);
        self.set_page(self.page);
        Some(pending)
    }

    /// Restores the list as it was before the removal.
    pub fn rollback(&mut self, pending: PendingRemoval) {
        self.all = pending.previous;
        self.page = pending.page;
    }
}

impl Default for QuotationPicker {
    fn default() -> Self {
        QuotationPicker::new(Vec::new())
    }
}
