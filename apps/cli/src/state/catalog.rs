//! # Catalog Cache
//!
//! Process-wide SKU table, fetched in one bulk call and kept in memory.
//!
//! ## Cache Behaviour
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load(force=false)                                                     │
//! │     ├── cached & non-empty ──────────────────────► return cached        │
//! │     └── otherwise ── source.fetch() ─┬─ Ok  ─────► replace, return      │
//! │                                      └─ Err ─────► keep previous,       │
//! │                                                    return Unavailable   │
//! │  invalidate() ── drop the table; next load refetches                   │
//! │  suggest(q)   ── substring match over the cached keys, never fetches   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A refresh racing a reader hands the reader either the old or the new
//! table; both are complete snapshots behind an `Arc`.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tally_core::{Catalog, SUGGESTION_LIMIT};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CatalogSettings;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Fetch or parse failed. The previous table, if any, is still cached.
    #[error("SKU catalog unavailable: {0}")]
    Unavailable(String),

    #[error("No catalog URL configured (set catalog.url or TALLY_CATALOG_URL)")]
    NotConfigured,
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Unavailable(err.to_string())
    }
}

/// Where the bulk SKU table comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Catalog, CatalogError>;
}

// =============================================================================
// HTTP Source
// =============================================================================

/// Fetches the sheet's CSV export over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
    cache_bust: bool,
}

impl HttpCatalogSource {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        let url = settings.url.clone().ok_or(CatalogError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(HttpCatalogSource {
            client,
            url,
            cache_bust: settings.cache_bust,
        })
    }

    fn request_url(&self) -> String {
        if !self.cache_bust {
            return self.url.clone();
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}t={}", self.url, sep, Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<Catalog, CatalogError> {
        let url = self.request_url();
        debug!(url = %url, "Fetching SKU catalog");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Catalog::from_csv(&body).map_err(|e| CatalogError::Unavailable(e.to_string()))
    }
}

/// Stands in when no catalog URL is set. Commands that never price (list,
/// show, delete) still work; anything that fetches gets `NotConfigured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredSource;

#[async_trait]
impl CatalogSource for UnconfiguredSource {
    async fn fetch(&self) -> Result<Catalog, CatalogError> {
        Err(CatalogError::NotConfigured)
    }
}

/// Picks the HTTP source when a URL is configured.
pub fn source_from_settings(settings: &CatalogSettings) -> Result<Arc<dyn CatalogSource>, CatalogError> {
    match HttpCatalogSource::new(settings) {
        Ok(source) => Ok(Arc::new(source)),
        Err(CatalogError::NotConfigured) => {
            warn!("No catalog URL configured, item pricing is unavailable");
            Ok(Arc::new(UnconfiguredSource))
        }
        Err(e) => Err(e),
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Injectable catalog cache owned by the composition root.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    current: RwLock<Option<Arc<Catalog>>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        CatalogCache {
            source,
            current: RwLock::new(None),
        }
    }

    /// Returns the cached table, fetching it when empty or when `force`.
    pub async fn load(&self, force: bool) -> Result<Arc<Catalog>, CatalogError> {
        if !force {
            if let Some(catalog) = self.snapshot().filter(|c| !c.is_empty()) {
                return Ok(catalog);
            }
        }

        match self.source.fetch().await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                info!(skus = catalog.len(), "SKU catalog loaded");
                *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(catalog.clone());
                Ok(catalog)
            }
            Err(e) => {
                warn!(error = %e, cached = self.snapshot().is_some(), "SKU catalog fetch failed");
                Err(e)
            }
        }
    }

    pub fn invalidate(&self) {
        debug!("SKU catalog invalidated");
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Up to eight matching SKU codes from the cached table.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        self.snapshot()
            .map(|catalog| catalog.suggest(query, SUGGESTION_LIMIT))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<Arc<Catalog>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("cached_skus", &self.snapshot().map(|c| c.len()))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tally_core::{CatalogEntry, Money};

    /// Serves a fixed table; can be switched to failing.
    pub(crate) struct FakeSource {
        pub fetches: AtomicUsize,
        pub failing: AtomicBool,
        pub catalog: Catalog,
    }

    impl FakeSource {
        pub(crate) fn new(entries: &[(&str, i64, u32)]) -> Self {
            FakeSource {
                fetches: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                catalog: Catalog::from_entries(entries.iter().map(|(sku, mrp, pack)| {
                    (sku.to_string(), CatalogEntry::new(Money::from_major(*mrp), *pack))
                })),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for FakeSource {
        async fn fetch(&self) -> Result<Catalog, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(CatalogError::Unavailable("offline".into()));
            }
            Ok(self.catalog.clone())
        }
    }

    #[tokio::test]
    async fn test_load_caches() {
        let source = Arc::new(FakeSource::new(&[("ABC", 1000, 6)]));
        let cache = CatalogCache::new(source.clone());

        cache.load(false).await.unwrap();
        cache.load(false).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        cache.load(true).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let source = Arc::new(FakeSource::new(&[("ABC", 1000, 6)]));
        let cache = CatalogCache::new(source.clone());

        cache.load(false).await.unwrap();
        cache.invalidate();
        assert!(cache.snapshot().is_none());

        cache.load(false).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_table() {
        let source = Arc::new(FakeSource::new(&[("ABC", 1000, 6)]));
        let cache = CatalogCache::new(source.clone());
        cache.load(false).await.unwrap();

        source.failing.store(true, Ordering::SeqCst);
        let err = cache.load(true).await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));

        let kept = cache.snapshot().unwrap();
        assert!(kept.get("ABC").is_some());
    }

    #[tokio::test]
    async fn test_suggest_never_fetches() {
        let source = Arc::new(FakeSource::new(&[("TEE-RED", 500, 6), ("TEE-BLUE", 500, 6)]));
        let cache = CatalogCache::new(source.clone());

        assert!(cache.suggest("tee").is_empty());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

        cache.load(false).await.unwrap();
        assert_eq!(cache.suggest("tee"), vec!["TEE-BLUE", "TEE-RED"]);
    }

    #[test]
    fn test_cache_bust_param() {
        let settings = CatalogSettings {
            url: Some("https://example.com/export?format=csv".into()),
            ..CatalogSettings::default()
        };
        let source = HttpCatalogSource::new(&settings).unwrap();
        assert!(source.request_url().starts_with("https://example.com/export?format=csv&t="));

        let plain = HttpCatalogSource::new(&CatalogSettings {
            url: Some("https://example.com/export".into()),
            cache_bust: false,
            ..CatalogSettings::default()
        })
        .unwrap();
        assert_eq!(plain.request_url(), "https://example.com/export");
    }

    #[test]
    fn test_missing_url_is_not_configured() {
        assert!(matches!(
            HttpCatalogSource::new(&CatalogSettings::default()),
            Err(CatalogError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_source_refuses_fetch() {
        let source = source_from_settings(&CatalogSettings::default()).unwrap();
        let cache = CatalogCache::new(source);

        assert!(matches!(cache.load(false).await, Err(CatalogError::NotConfigured)));
        assert!(cache.suggest("a").is_empty());
    }
}
