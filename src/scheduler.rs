use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::bot::MirrorBot;
use crate::config::{Schedule, LIVE_POLL_INTERVAL};

/// When a periodic task first runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    Immediately,
    /// The task was already run at startup; wait one period.
    AfterPeriod,
}

/// Run `task` every `period`. A failed run is logged and the loop waits for
/// the next tick.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    first: FirstRun,
    task: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if first == FirstRun::AfterPeriod {
            ticker.tick().await;
        }
        loop {
            ticker.tick().await;
            if let Err(err) = task().await {
                warn!(task = name, error = ?err, "cycle skipped");
            }
        }
    })
}

pub struct Scheduler {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    /// Start the stats, members, feed, reminder and live loops. Members and feed
    /// are primed by the caller at startup, so their first run waits a period.
    pub fn start(bot: Arc<MirrorBot>, schedule: &Schedule) -> Self {
        use FirstRun::{AfterPeriod, Immediately};
        let mut handles = Vec::new();

        let b = Arc::clone(&bot);
        let stats = move || {
            let bot = Arc::clone(&b);
            async move { bot.refresh_stats().await }
        };
        handles.push((
            "stats",
            spawn_periodic("stats", schedule.stats_interval(), Immediately, stats),
        ));

        let b = Arc::clone(&bot);
        let members = move || {
            let bot = Arc::clone(&b);
            async move { bot.refresh_members().await }
        };
        handles.push((
            "members",
            spawn_periodic("members", schedule.members_interval(), AfterPeriod, members),
        ));

        let b = Arc::clone(&bot);
        let feed = move || {
            let bot = Arc::clone(&b);
            async move { bot.refresh_feed().await.map(|_| ()) }
        };
        handles.push((
            "feed",
            spawn_periodic("feed", schedule.feed_interval(), AfterPeriod, feed),
        ));

        let b = Arc::clone(&bot);
        let reminder = move || {
            let bot = Arc::clone(&b);
            async move { bot.post_reminder().await.map(|_| ()) }
        };
        handles.push((
            "reminder",
            spawn_periodic("reminder", schedule.reminder_interval(), Immediately, reminder),
        ));

        let live = move || {
            let bot = Arc::clone(&bot);
            async move { bot.poll_live().await.map(|_| ()) }
        };
        handles.push((
            "live",
            spawn_periodic("live", LIVE_POLL_INTERVAL, Immediately, live),
        ));

        info!(tasks = handles.len(), "periodic tasks started");
        Self { handles }
    }

    /// Abort every loop; in-flight requests are dropped.
    pub fn shutdown(self) {
        for (name, handle) in self.handles {
            handle.abort();
            info!(task = name, "stopped");
        }
    }
}
