//! Consumer side of the catalog endpoint, as used by the Mini App front end.
use async_trait::async_trait;

use crate::transform::CatalogItem;

mod favorites;
mod feed;
mod proxy;
mod search;

pub use favorites::FavoritesStore;
pub use feed::{CatalogFeed, FeedState, LOAD_ERROR_MESSAGE};
pub use proxy::ProxyClient;
pub use search::{SearchResults, SearchSession, DEFAULT_DEBOUNCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Trending,
    Seasonal,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Trending => "trending",
            ListKind::Seasonal => "seasonal",
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// `Ok(None)` when the endpoint answered with a non-success status.
    /// `Err` covers transport and decode failures.
    async fn list(&self, kind: ListKind) -> anyhow::Result<Option<Vec<CatalogItem>>>;
    /// Empty on blank queries and on any failure.
    async fn search(&self, query: &str) -> Vec<CatalogItem>;
    /// `None` on any failure.
    async fn details(&self, id: u32) -> Option<CatalogItem>;
}
