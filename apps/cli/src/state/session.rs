//! # Quotation Session
//!
//! The quotation being edited, plus the busy flag that serialises the
//! async operations on it.
//!
//! ## Busy Flag
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save / load / delete / catalog load                                   │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  begin() ── busy already set? ──► Err(BUSY)   (no queueing)            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  BusyGuard ── snapshot() ── await store ── replace() on success        │
//! │     │                                                                   │
//! │     ▼ (drop, also on error or panic)                                    │
//! │  busy cleared                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edits are synchronous and are refused while an operation is in flight,
//! so the snapshot an operation works on cannot go stale underneath it.

use std::sync::atomic::{AtomicBool, Ordering};

use tally_core::Quotation;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ApiError;

/// Clears the busy flag when dropped.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct QuotationSession {
    current: Mutex<Quotation>,
    busy: AtomicBool,
}

impl QuotationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an async operation as in flight.
    pub fn begin(&self) -> Result<BusyGuard<'_>, ApiError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ApiError::busy())?;
        Ok(BusyGuard { flag: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// A copy of the current quotation.
    pub async fn snapshot(&self) -> Quotation {
        self.current.lock().await.clone()
    }

    /// Applies a synchronous edit. Refused while an operation is in flight.
    pub async fn edit<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Quotation) -> R,
    {
        // Checked under the lock: an operation may begin while we wait.
        let mut current = self.current.lock().await;
        if self.is_busy() {
            return Err(ApiError::busy());
        }
        Ok(f(&mut current))
    }

    /// Writes back the result of a successful operation.
    pub async fn replace(&self, quotation: Quotation) {
        debug!(id = ?quotation.id, "Session quotation replaced");
        *self.current.lock().await = quotation;
    }

    /// Discards the current quotation and starts a blank one.
    pub async fn new_quotation(&self) -> Result<(), ApiError> {
        let _guard = self.begin()?;
        self.replace(Quotation::new()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_second_begin_is_busy() {
        let session = QuotationSession::new();

        let guard = session.begin().unwrap();
        assert!(session.is_busy());
        assert_eq!(session.begin().unwrap_err().code, ErrorCode::Busy);

        drop(guard);
        assert!(!session.is_busy());
        assert!(session.begin().is_ok());
    }

    #[tokio::test]
    async fn test_edits_refused_while_busy() {
        let session = QuotationSession::new();

        let _guard = session.begin().unwrap();
        let result = session.edit(|q| q.party = "Acme".into()).await;
        assert_eq!(result.unwrap_err().code, ErrorCode::Busy);
        assert_eq!(session.snapshot().await.party, "");
    }

    #[tokio::test]
    async fn test_edit_waiting_on_lock_sees_later_begin() {
        let session = std::sync::Arc::new(QuotationSession::new());

        let held = session.current.lock().await;
        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.edit(|q| q.party = "Acme".into()).await }
        });
        tokio::task::yield_now().await;

        let _guard = session.begin().unwrap();
        drop(held);

        let result = pending.await.unwrap();
        assert_eq!(result.unwrap_err().code, ErrorCode::Busy);
        assert_eq!(session.snapshot().await.party, "");
    }

    #[tokio::test]
    async fn test_new_quotation_resets() {
        let session = QuotationSession::new();
        session.edit(|q| q.party = "Acme".into()).await.unwrap();

        session.new_quotation().await.unwrap();
        assert_eq!(session.snapshot().await, Quotation::new());
    }
}
