use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::jikan::JIKAN_BASE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub list_ttl: Duration,
    pub detail_ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            list_ttl: Duration::from_secs(600),
            detail_ttl: Duration::from_secs(3600),
            max_entries: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub jikan_base_url: String,
    pub upstream_timeout: Duration,
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            jikan_base_url: JIKAN_BASE.to_string(),
            upstream_timeout: Duration::from_secs(30),
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset or blank variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => parse_var("BIND_ADDR", &v)?,
            None => defaults.bind_addr,
        };
        let jikan_base_url = get("JIKAN_BASE_URL").unwrap_or(defaults.jikan_base_url);
        let upstream_timeout = match get("UPSTREAM_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS", &v)?),
            None => defaults.upstream_timeout,
        };

        let mut cache = defaults.cache;
        if let Some(v) = get("CACHE_LIST_TTL_SECS") {
            cache.list_ttl = Duration::from_secs(parse_var("CACHE_LIST_TTL_SECS", &v)?);
        }
        if let Some(v) = get("CACHE_DETAIL_TTL_SECS") {
            cache.detail_ttl = Duration::from_secs(parse_var("CACHE_DETAIL_TTL_SECS", &v)?);
        }
        if let Some(v) = get("CACHE_MAX_ENTRIES") {
            cache.max_entries = parse_var("CACHE_MAX_ENTRIES", &v)?;
        }

        Ok(Self {
            bind_addr,
            jikan_base_url,
            upstream_timeout,
            cache,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", key, raw))
}
