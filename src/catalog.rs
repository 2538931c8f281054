use chrono::{Datelike, Local, NaiveDate};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::config::CacheSettings;
use crate::error::UpstreamError;
use crate::jikan::{AnimeRecord, JikanApi};
use crate::season::Season;
use crate::transform::{transform, CatalogItem};

pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Raw upstream payloads, cached before they are transformed.
#[derive(Clone)]
enum Cached {
    List(Arc<Vec<AnimeRecord>>),
    Detail(Arc<AnimeRecord>),
}

pub struct Catalog {
    jikan: Arc<dyn JikanApi>,
    cache: ResponseCache<Cached>,
    settings: CacheSettings,
    clock: Clock,
}

impl Catalog {
    pub fn new(jikan: Arc<dyn JikanApi>, settings: CacheSettings) -> Self {
        Self::with_clock(jikan, settings, Arc::new(|| Local::now().date_naive()))
    }

    pub fn with_clock(jikan: Arc<dyn JikanApi>, settings: CacheSettings, clock: Clock) -> Self {
        Self {
            jikan,
            cache: ResponseCache::new(settings.max_entries),
            settings,
            clock,
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, UpstreamError> {
        let key = format!("search_{}", query);
        self.cached_list(key, || self.jikan.search_anime(query)).await
    }

    pub async fn trending(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
        self.cached_list("trending".to_string(), || self.jikan.top_airing()).await
    }

    pub async fn seasonal(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
        let (year, season) = Season::current((self.clock)());
        let key = format!("seasonal_{}_{}", year, season);
        self.cached_list(key, || self.jikan.season_anime(year, season)).await
    }

    pub async fn details(&self, id: u32) -> Result<Option<CatalogItem>, UpstreamError> {
        let key = format!("details_{}", id);
        let year = self.current_year();
        if let Some(Cached::Detail(record)) = self.cache.get(&key).await {
            debug!(key = %key, "Cache hit");
            return Ok(Some(transform(&record, year)));
        }
        debug!(key = %key, "Cache miss");
        let Some(record) = self.jikan.anime_full(id).await? else {
            return Ok(None);
        };
        let item = transform(&record, year);
        self.cache
            .set(key, Cached::Detail(Arc::new(record)), self.settings.detail_ttl)
            .await;
        Ok(Some(item))
    }

    async fn cached_list<F, Fut>(
        &self,
        key: String,
        fetch: F,
    ) -> Result<Vec<CatalogItem>, UpstreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<AnimeRecord>, UpstreamError>>,
    {
        let year = self.current_year();
        let records = match self.cache.get(&key).await {
            Some(Cached::List(records)) => {
                debug!(key = %key, "Cache hit");
                records
            }
            _ => {
                debug!(key = %key, "Cache miss");
                let records = Arc::new(fetch().await?);
                self.cache
                    .set(key, Cached::List(records.clone()), self.settings.list_ttl)
                    .await;
                records
            }
        };
        Ok(records.iter().map(|r| transform(r, year)).collect())
    }

    fn current_year(&self) -> i32 {
        (self.clock)().year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingJikan {
        calls: AtomicUsize,
        seasons: Mutex<Vec<(i32, Season)>>,
        fail: bool,
    }

    fn record(id: u32, title: &str) -> AnimeRecord {
        AnimeRecord {
            mal_id: id,
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn failure() -> UpstreamError {
        UpstreamError::Status {
            url: "http://jikan.test".to_string(),
            status: 503,
        }
    }

    #[async_trait]
    impl JikanApi for CountingJikan {
        async fn search_anime(&self, query: &str) -> Result<Vec<AnimeRecord>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(failure());
            }
            Ok(vec![record(1, query)])
        }
        async fn top_airing(&self) -> Result<Vec<AnimeRecord>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(failure());
            }
            Ok(vec![record(2, "Top"), record(3, "Second")])
        }
        async fn season_anime(
            &self,
            year: i32,
            season: Season,
        ) -> Result<Vec<AnimeRecord>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seasons.lock().unwrap().push((year, season));
            Ok(vec![record(4, "Seasonal")])
        }
        async fn anime_full(&self, id: u32) -> Result<Option<AnimeRecord>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((id == 20).then(|| record(20, "Naruto")))
        }
    }

    fn fixed_clock(date: Arc<Mutex<NaiveDate>>) -> Clock {
        Arc::new(move || *date.lock().unwrap())
    }

    fn catalog_on(jikan: Arc<CountingJikan>, y: i32, m: u32, d: u32) -> Catalog {
        let date = Arc::new(Mutex::new(NaiveDate::from_ymd_opt(y, m, d).unwrap()));
        Catalog::with_clock(jikan, CacheSettings::default(), fixed_clock(date))
    }

    #[tokio::test]
    async fn repeated_list_calls_hit_upstream_once() {
        let jikan = Arc::new(CountingJikan::default());
        let catalog = catalog_on(jikan.clone(), 2025, 4, 1);

        let first = catalog.trending().await.unwrap();
        let second = catalog.trending().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 1);

        catalog.search("Naruto").await.unwrap();
        catalog.search("Naruto").await.unwrap();
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 2);

        catalog.search("Bleach").await.unwrap();
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn list_order_is_preserved() {
        let jikan = Arc::new(CountingJikan::default());
        let catalog = catalog_on(jikan, 2025, 4, 1);
        let ids: Vec<u32> = catalog
            .trending()
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn october_requests_fall_of_current_year() {
        let jikan = Arc::new(CountingJikan::default());
        let catalog = catalog_on(jikan.clone(), 2025, 10, 18);
        catalog.seasonal().await.unwrap();
        assert_eq!(
            *jikan.seasons.lock().unwrap(),
            vec![(2025, Season::Fall)]
        );
    }

    #[tokio::test]
    async fn new_season_misses_stale_seasonal_entry() {
        let jikan = Arc::new(CountingJikan::default());
        let date = Arc::new(Mutex::new(NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()));
        let catalog =
            Catalog::with_clock(jikan.clone(), CacheSettings::default(), fixed_clock(date.clone()));

        catalog.seasonal().await.unwrap();
        catalog.seasonal().await.unwrap();
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 1);

        *date.lock().unwrap() = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        catalog.seasonal().await.unwrap();
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *jikan.seasons.lock().unwrap(),
            vec![(2025, Season::Fall), (2025, Season::Winter)]
        );
    }

    #[tokio::test]
    async fn failures_are_returned_and_not_cached() {
        let jikan = Arc::new(CountingJikan {
            fail: true,
            ..Default::default()
        });
        let catalog = catalog_on(jikan.clone(), 2025, 4, 1);
        assert!(catalog.trending().await.is_err());
        assert!(catalog.trending().await.is_err());
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn details_cache_found_records_only() {
        let jikan = Arc::new(CountingJikan::default());
        let catalog = catalog_on(jikan.clone(), 2025, 4, 1);

        let item = catalog.details(20).await.unwrap().expect("found");
        assert_eq!(item.title, "Naruto");
        assert_eq!(item.year, 2025);
        catalog.details(20).await.unwrap();
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 1);

        assert!(catalog.details(999_999).await.unwrap().is_none());
        assert!(catalog.details(999_999).await.unwrap().is_none());
        assert_eq!(jikan.calls.load(Ordering::SeqCst), 3);
    }
}
