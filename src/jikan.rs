use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::season::Season;

pub const JIKAN_BASE: &str = "https://api.jikan.moe/v4";
const PAGE_LIMIT: u32 = 20;

#[async_trait]
pub trait JikanApi: Send + Sync {
    /// Up to 20 matches, best score first.
    async fn search_anime(&self, query: &str) -> Result<Vec<AnimeRecord>, UpstreamError>;
    /// Up to 20 top-ranked titles that are currently airing.
    async fn top_airing(&self) -> Result<Vec<AnimeRecord>, UpstreamError>;
    async fn season_anime(
        &self,
        year: i32,
        season: Season,
    ) -> Result<Vec<AnimeRecord>, UpstreamError>;
    /// `Ok(None)` when the id is unknown upstream.
    async fn anime_full(&self, id: u32) -> Result<Option<AnimeRecord>, UpstreamError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimeRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub mal_id: u32,
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub genres: Option<Vec<Genre>>,
    pub images: Option<Images>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    pub duration: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Genre {
    pub name: Option<String>,
}

// Numeric fields accept any JSON number or null. Fractions truncate and
// out-of-range values clamp, so one odd record cannot fail a whole page.
fn lenient_number<'de, D>(deserializer: D, min: f64, max: f64) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|n| n.is_finite())
        .map(|n| n.trunc().clamp(min, max)))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_count(deserializer)?.unwrap_or_default())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_number(deserializer, 0.0, f64::from(u32::MAX))?;
    Ok(n.map(|n| n as u32))
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_number(deserializer, f64::from(i32::MIN), f64::from(i32::MAX))?;
    Ok(n.map(|n| n as i32))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    pub jpg: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSet {
    pub large_image_url: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Clone)]
pub struct JikanClient {
    client: Client,
    base_url: String,
}

impl JikanClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let user_agent = format!("animelink/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build Jikan HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_data<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, UpstreamError> {
        let result = self.fetch_data(url).await;
        if let Err(e) = &result {
            warn!(url = %url, error = %e, "Jikan request failed");
        }
        result
    }

    async fn fetch_data<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, UpstreamError> {
        debug!(url = %url, "Jikan request");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = res.bytes().await.map_err(|source| UpstreamError::Request {
            url: url.to_string(),
            source,
        })?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|source| UpstreamError::Decode {
                url: url.to_string(),
                source,
            })?;
        Ok(envelope.data)
    }

    async fn get_list(&self, url: &str) -> Result<Vec<AnimeRecord>, UpstreamError> {
        Ok(self.get_data(url).await?.unwrap_or_default())
    }
}

#[async_trait]
impl JikanApi for JikanClient {
    async fn search_anime(&self, query: &str) -> Result<Vec<AnimeRecord>, UpstreamError> {
        let url = format!(
            "{}/anime?q={}&limit={PAGE_LIMIT}&order_by=score&sort=desc",
            self.base_url,
            urlencoding::encode(query)
        );
        self.get_list(&url).await
    }

    async fn top_airing(&self) -> Result<Vec<AnimeRecord>, UpstreamError> {
        let url = format!("{}/top/anime?limit={PAGE_LIMIT}&filter=airing", self.base_url);
        self.get_list(&url).await
    }

    async fn season_anime(
        &self,
        year: i32,
        season: Season,
    ) -> Result<Vec<AnimeRecord>, UpstreamError> {
        let url = format!(
            "{}/seasons/{year}/{season}?limit={PAGE_LIMIT}",
            self.base_url
        );
        self.get_list(&url).await
    }

    async fn anime_full(&self, id: u32) -> Result<Option<AnimeRecord>, UpstreamError> {
        let url = format!("{}/anime/{id}/full", self.base_url);
        self.get_data(&url).await
    }
}
