//! Replay queue for old-video reminders.
//!
//! The queue holds shared handles to cache entries. Every feed refresh rebuilds
//! it as a full shuffle of the cache; every reminder pops one entry and puts it
//! back at a random position, so the queue keeps its length and every entry
//! stays eligible forever.
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::cache::EntryCache;
use crate::model::FeedEntry;

#[derive(Debug)]
pub struct ReminderQueue {
    items: Vec<Arc<FeedEntry>>,
    rng: StdRng,
}

impl Default for ReminderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderQueue {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the contents with a uniform shuffle of every cached entry.
    pub fn rebuild(&mut self, cache: &EntryCache) {
        self.items = cache.values().cloned().map(Arc::new).collect();
        self.items.shuffle(&mut self.rng);
    }

    pub fn pop(&mut self) -> Option<Arc<FeedEntry>> {
        self.items.pop()
    }

    /// Put an entry back at a uniformly random index in `0..=len`.
    pub fn reinsert(&mut self, entry: Arc<FeedEntry>) {
        let at = self.rng.gen_range(0..=self.items.len());
        self.items.insert(at, entry);
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|e| e.id.as_str()).collect()
    }
}
