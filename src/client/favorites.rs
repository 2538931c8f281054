use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::transform::CatalogItem;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesFile {
    ids: BTreeSet<u32>,
}

/// Per-user favorites, persisted as `favorites_<user>.json` inside a directory.
/// Changes stay in memory until [`FavoritesStore::save`].
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    ids: BTreeSet<u32>,
}

impl FavoritesStore {
    /// A missing file yields an empty store.
    pub async fn load(dir: impl AsRef<Path>, user_key: &str) -> Result<Self> {
        let path = favorites_path(dir.as_ref(), user_key);
        let ids = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let file: FavoritesFile = serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse favorites file: {}", path.display())
                })?;
                file.ids
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No favorites file yet");
                BTreeSet::new()
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read favorites file: {}", path.display())
                })
            }
        };
        Ok(Self { path, ids })
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&FavoritesFile {
            ids: self.ids.clone(),
        })
        .context("Failed to serialize favorites")?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write favorites file: {}", self.path.display()))?;
        info!(path = %self.path.display(), count = self.ids.len(), "Favorites saved");
        Ok(())
    }

    /// Returns whether `id` is a favorite after the toggle.
    pub fn toggle(&mut self, id: u32) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Favorites among `items`, in their original order.
    pub fn select<'a>(&self, items: &'a [CatalogItem]) -> Vec<&'a CatalogItem> {
        items.iter().filter(|i| self.contains(i.id)).collect()
    }
}

fn favorites_path(dir: &Path, user_key: &str) -> PathBuf {
    let safe_key: String = user_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("favorites_{}.json", safe_key))
}
