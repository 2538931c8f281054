use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use super::CatalogSource;
use crate::transform::CatalogItem;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub query: String,
    pub items: Vec<CatalogItem>,
}

/// Debounced search where only the most recent submission is ever applied.
///
/// Every `submit` takes a ticket. A submission that is superseded while
/// waiting out the debounce never reaches the network, and a response that
/// lands after a newer submission is dropped.
pub struct SearchSession {
    source: Arc<dyn CatalogSource>,
    debounce: Duration,
    latest: AtomicU64,
    results: Mutex<Option<SearchResults>>,
}

impl SearchSession {
    pub fn new(source: Arc<dyn CatalogSource>, debounce: Duration) -> Self {
        Self {
            source,
            debounce,
            latest: AtomicU64::new(0),
            results: Mutex::new(None),
        }
    }

    /// Returns the items when this submission was applied, `None` when it was superseded.
    pub async fn submit(&self, query: &str) -> Option<Vec<CatalogItem>> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.debounce).await;
        if !self.is_current(ticket) {
            debug!(query = %query, ticket, "Search superseded before request");
            return None;
        }

        let items = self.source.search(query).await;
        if !self.is_current(ticket) {
            debug!(query = %query, ticket, "Discarding stale search response");
            return None;
        }

        let mut guard = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(SearchResults {
            query: query.to_string(),
            items: items.clone(),
        });
        Some(items)
    }

    pub fn results(&self) -> Option<SearchResults> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}
