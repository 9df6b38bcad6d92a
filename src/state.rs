//! Mutable state shared by the periodic tasks. Each piece sits behind its own
//! lock so, for example, a queue rebuild cannot interleave with a reminder pop.
use tokio::sync::Mutex;

use crate::channels::ChannelIdStore;
use crate::detect::ChangeDetector;
use crate::live::LiveTracker;
use crate::model::{ChannelMeta, StatsSnapshot};
use crate::queue::ReminderQueue;

#[derive(Debug)]
pub struct AppState {
    pub queue: Mutex<ReminderQueue>,
    pub stats: Mutex<ChangeDetector<StatsSnapshot>>,
    pub members: Mutex<ChangeDetector<u64>>,
    pub live: Mutex<LiveTracker>,
    pub channels: Mutex<ChannelIdStore>,
    pub meta: Mutex<ChannelMeta>,
}

impl AppState {
    pub fn new(channels: ChannelIdStore) -> Self {
        Self::with_queue(channels, ReminderQueue::new())
    }

    pub fn with_queue(channels: ChannelIdStore, queue: ReminderQueue) -> Self {
        Self {
            queue: Mutex::new(queue),
            stats: Mutex::new(ChangeDetector::new()),
            members: Mutex::new(ChangeDetector::new()),
            live: Mutex::new(LiveTracker::default()),
            channels: Mutex::new(channels),
            meta: Mutex::new(ChannelMeta::default()),
        }
    }
}
