//! Accumulating cache of every feed entry ever observed, keyed by video id.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::FeedEntry;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EntryCache {
    entries: HashMap<String, FeedEntry>,
}

impl EntryCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FeedEntry> {
        self.entries.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.values()
    }

    /// Insert unseen entries and update known ones with the non-empty fields of
    /// the incoming copy. Returns how many entries were newly inserted.
    pub fn merge<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = FeedEntry>,
    {
        let mut added = 0;
        for entry in incoming {
            if entry.id.is_empty() {
                continue;
            }
            match self.entries.get_mut(&entry.id) {
                None => {
                    if entry.link.is_empty() {
                        continue;
                    }
                    self.entries.insert(entry.id.clone(), entry);
                    added += 1;
                }
                Some(known) => {
                    if !entry.title.is_empty() {
                        known.title = entry.title;
                    }
                    if !entry.link.is_empty() {
                        known.link = entry.link;
                    }
                    if let Some(thumb) = entry.thumbnail.filter(|t| !t.is_empty()) {
                        known.thumbnail = Some(thumb);
                    }
                }
            }
        }
        added
    }

    /// Load the cache from disk. Missing, unreadable or malformed files yield an
    /// empty cache. Stored records lacking an id or link are skipped.
    pub async fn load(path: &Path) -> Self {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(error = %err, path = %path.display(), "no feed cache on disk");
                return Self::default();
            }
        };
        let raw: HashMap<String, serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %path.display(),
                    "failed to parse feed cache; starting empty"
                );
                return Self::default();
            }
        };
        let mut cache = Self::default();
        for (id, value) in raw {
            match serde_json::from_value::<FeedEntry>(value) {
                Ok(mut entry) if !id.is_empty() && !entry.link.is_empty() => {
                    entry.id = id.clone();
                    cache.entries.insert(id, entry);
                }
                Ok(_) => debug!(%id, "skipping incomplete cached entry"),
                Err(err) => warn!(error = %err, %id, "skipping unreadable cached entry"),
            }
        }
        cache
    }

    /// Persist the whole cache atomically (write to a temp file, then rename).
    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.entries).context("serialize feed cache")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to persist {}", path.display()))?;
        Ok(())
    }
}
