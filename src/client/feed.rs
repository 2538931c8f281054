use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

use super::{CatalogSource, ListKind};
use crate::transform::CatalogItem;

pub const LOAD_ERROR_MESSAGE: &str = "Ma'lumotlarni yuklashda xatolik yuz berdi";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub trending: Vec<CatalogItem>,
    pub seasonal: Vec<CatalogItem>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Home screen lists. Starts in the loading state until the first load finishes.
pub struct CatalogFeed {
    source: Arc<dyn CatalogSource>,
    state: Mutex<FeedState>,
}

impl CatalogFeed {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            state: Mutex::new(FeedState {
                loading: true,
                ..FeedState::default()
            }),
        }
    }

    pub fn snapshot(&self) -> FeedState {
        self.lock().clone()
    }

    /// Fetches both lists in parallel. A transport failure on either side sets
    /// the error and applies neither list; an error status only skips its own.
    pub async fn load_initial(&self) {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let (trending, seasonal) = tokio::join!(
            self.source.list(ListKind::Trending),
            self.source.list(ListKind::Seasonal)
        );

        let mut state = self.lock();
        state.loading = false;
        let (trending, seasonal) = match (trending, seasonal) {
            (Ok(trending), Ok(seasonal)) => (trending, seasonal),
            (Err(e), _) | (_, Err(e)) => {
                error!("Load initial data error: {:#}", e);
                state.error = Some(LOAD_ERROR_MESSAGE.to_string());
                return;
            }
        };
        if let Some(items) = trending {
            state.trending = items;
        }
        if let Some(items) = seasonal {
            state.seasonal = items;
        }
    }

    pub async fn refetch(&self) {
        self.load_initial().await
    }

    pub async fn search(&self, query: &str) -> Vec<CatalogItem> {
        self.source.search(query).await
    }

    pub async fn details(&self, id: u32) -> Option<CatalogItem> {
        self.source.details(id).await
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
