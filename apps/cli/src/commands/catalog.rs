//! # Catalog Commands

use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Fetches the table again and returns the SKU count. A failed fetch
/// leaves the previous table in place.
pub async fn refresh_catalog(state: &AppState) -> Result<usize, ApiError> {
    let _guard = state.session.begin()?;
    let catalog = state.catalog.load(true).await?;
    Ok(catalog.len())
}

/// Autosuggest over the cached table. Never fetches.
pub fn suggest_skus(state: &AppState, query: &str) -> Vec<String> {
    debug!(query = %query, "suggest_skus command");
    state.catalog.suggest(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::app_state;

    #[tokio::test]
    async fn test_refresh_then_suggest() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path()).await;

        assert!(suggest_skus(&state, "ab").is_empty());
        assert_eq!(refresh_catalog(&state).await.unwrap(), 3);
        assert_eq!(suggest_skus(&state, "ab"), vec!["ABC"]);
    }
}
