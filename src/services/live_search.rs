//! Debounced search for queries typed live.
//!
//! Every submission supersedes the ones before it. A query runs only after
//! the debounce interval passes without a newer submission, and its results
//! are dropped if a newer query arrived while it was running.

use crate::Result;
use crate::config::CookbookConfig;
use crate::services::ranking::{DEFAULT_EXCERPT_LEN, RankedRecipe, rank};
use crate::services::store::RecipeStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Quiet period before a submitted query runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Last-query-wins search over a [`RecipeStore`].
#[derive(Clone)]
pub struct LiveSearch {
    store: RecipeStore,
    debounce: Duration,
    excerpt_len: usize,
    generation: Arc<AtomicU64>,
}

impl LiveSearch {
    /// Creates a live search with the default debounce and excerpt length.
    #[must_use]
    pub fn new(store: RecipeStore) -> Self {
        Self {
            store,
            debounce: DEFAULT_DEBOUNCE,
            excerpt_len: DEFAULT_EXCERPT_LEN,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a live search with the configured debounce and excerpt length.
    #[must_use]
    pub fn from_config(store: RecipeStore, config: &CookbookConfig) -> Self {
        Self::new(store)
            .with_debounce(config.debounce())
            .with_excerpt_len(config.search.excerpt_len)
    }

    /// Sets the debounce interval.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the excerpt length for ranked results.
    #[must_use]
    pub const fn with_excerpt_len(mut self, excerpt_len: usize) -> Self {
        self.excerpt_len = excerpt_len;
        self
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Supersedes any pending or running query.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Submits a query and waits for its ranked results.
    ///
    /// Returns `Ok(None)` if a newer query (or [`Self::cancel`]) superseded
    /// this one before its results were ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying search fails.
    pub async fn submit(&self, query: impl Into<String>) -> Result<Option<Vec<RankedRecipe>>> {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            tracing::trace!(query = %query, "Query superseded during debounce");
            return Ok(None);
        }

        let recipes = self.store.search_recipes(query.clone()).await?;
        if !self.is_current(generation) {
            tracing::trace!(query = %query, "Query superseded while running");
            metrics::counter!("cookbook_live_search_discarded_total").increment(1);
            return Ok(None);
        }

        Ok(Some(rank(&query, recipes, self.excerpt_len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recipe;

    async fn searcher() -> LiveSearch {
        let store = RecipeStore::in_memory().unwrap();
        store.create_recipe(Recipe::new("Seashore chowder")).await.unwrap();
        store.create_recipe(Recipe::new("Mountain stew")).await.unwrap();
        let mut config = CookbookConfig::new();
        config.search.debounce_ms = 50;
        LiveSearch::from_config(store, &config)
    }

    #[tokio::test]
    async fn test_single_query_returns_results() {
        let live = searcher().await;
        let results = live.submit("chowder").await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].recipe.name, "Seashore chowder");
    }

    #[tokio::test]
    async fn test_newer_query_supersedes_older() {
        let live = searcher().await;
        let (first, second) = tokio::join!(live.submit("sea"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            live.submit("stew").await
        });

        assert_eq!(first.unwrap(), None);
        let second = second.unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].recipe.name, "Mountain stew");
    }

    #[tokio::test]
    async fn test_cancel_discards_pending_query() {
        let live = searcher().await;
        let (result, ()) = tokio::join!(live.submit("sea"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            live.cancel();
        });
        assert_eq!(result.unwrap(), None);
    }
}
