//! In-memory response cache shared by all requests.
//!
//! Entries expire after a per-key TTL and the map never grows past
//! `max_entries`: a full cache first drops expired entries, then the oldest one.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    max_entries: usize,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        match guard.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                debug!(key = key, "Cache entry expired");
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    /// Overwrites any existing value for `key`.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        if !guard.contains_key(&key) && guard.len() >= self.max_entries {
            guard.retain(|_, e| e.expires_at > now);
            if guard.len() >= self.max_entries {
                let oldest = guard
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!(key = %oldest, "Evicting oldest cache entry");
                    guard.remove(&oldest);
                }
            }
        }
        guard.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
