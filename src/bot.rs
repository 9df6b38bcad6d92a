//! Bodies of the periodic tasks. Each one is a plain sequence of awaits; a
//! failure skips the rest of the cycle and the next tick starts fresh.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::EntryCache;
use crate::channels::{ensure_read_only, resolve_display_channels};
use crate::config::Config;
use crate::discord::{ChannelKind, ChatPlatform, GuildChannel};
use crate::embed::{
    live_alert_message, live_name, members_name, random_caption, reminder_message, stats_names,
};
use crate::feed::parse_entries;
use crate::live::LiveClassifier;
use crate::model::{DisplayRole, LiveState, StatsSnapshot};
use crate::state::AppState;
use crate::youtube::YouTubeService;

/// Live alerts are removed again after this long.
pub const ALERT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub channel_id: String,
    pub category_name: String,
    pub subs_goal: u64,
    pub reminder_channel_id: u64,
    pub live_alert_channel_id: u64,
    pub feed_cache_path: PathBuf,
    pub alert_ttl: Duration,
}

impl BotSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            channel_id: cfg.youtube.channel_id.clone(),
            category_name: cfg.discord.category_name.clone(),
            subs_goal: cfg.youtube.subs_goal,
            reminder_channel_id: cfg.discord.reminder_channel_id,
            live_alert_channel_id: cfg.discord.live_alert_channel_id,
            feed_cache_path: cfg.app.feed_cache_path(),
            alert_ttl: ALERT_TTL,
        }
    }
}

pub struct MirrorBot {
    settings: BotSettings,
    youtube: Arc<dyn YouTubeService>,
    chat: Arc<dyn ChatPlatform>,
    classifier: Arc<dyn LiveClassifier>,
    state: AppState,
}

impl MirrorBot {
    pub fn new(
        settings: BotSettings,
        youtube: Arc<dyn YouTubeService>,
        chat: Arc<dyn ChatPlatform>,
        classifier: Arc<dyn LiveClassifier>,
        state: AppState,
    ) -> Self {
        Self {
            settings,
            youtube,
            chat,
            classifier,
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Find or create the display surfaces and persist their ids.
    pub async fn ensure_display_channels(&self) -> Result<()> {
        let mut store = self.state.channels.lock().await;
        resolve_display_channels(self.chat.as_ref(), &mut store, &self.settings.category_name)
            .await
    }

    /// Fetch the upload feed, merge it into the persisted cache and reshuffle
    /// the reminder queue. Returns the number of new entries.
    #[instrument(skip_all)]
    pub async fn refresh_feed(&self) -> Result<usize> {
        let markup = self
            .youtube
            .fetch_feed(&self.settings.channel_id)
            .await
            .context("feed fetch failed")?;
        let entries = parse_entries(&markup).context("feed parse failed")?;

        let path = &self.settings.feed_cache_path;
        let mut cache = EntryCache::load(path).await;
        let added = cache.merge(entries);
        if added > 0 {
            if let Err(err) = cache.save(path).await {
                error!(?err, "failed to save feed cache");
            }
        }

        let mut queue = self.state.queue.lock().await;
        queue.rebuild(&cache);
        if added > 0 {
            info!(added, queue = queue.len(), "feed refresh added new entries");
        } else {
            debug!(queue = queue.len(), "feed refresh found nothing new");
        }
        Ok(added)
    }

    /// Post one reminder for a queued entry, then put the entry back at a
    /// random position. Returns whether a message was sent.
    #[instrument(skip_all)]
    pub async fn post_reminder(&self) -> Result<bool> {
        let target = self.settings.reminder_channel_id;
        if target == 0 {
            return Ok(false);
        }

        let mut queue = self.state.queue.lock().await;
        if queue.is_empty() {
            let cache = EntryCache::load(&self.settings.feed_cache_path).await;
            queue.rebuild(&cache);
        }
        let Some(entry) = queue.pop() else {
            info!("reminder queue empty; nothing to post");
            return Ok(false);
        };

        let meta = self.state.meta.lock().await.clone();
        let message = reminder_message(&entry, &meta, &self.settings.channel_id, random_caption());
        let posted = match self.chat.send_message(target, &message).await {
            Ok(_) => {
                info!(title = %entry.title, "posted reminder");
                true
            }
            Err(err) if err.is_forbidden() => {
                error!(error = %err, "missing permission to send in reminder channel");
                false
            }
            Err(err) => {
                error!(error = %err, "failed to send reminder");
                false
            }
        };
        queue.reinsert(entry);
        Ok(posted)
    }

    /// Stats cycle: mirror statistics onto the display surfaces, refresh the
    /// member count and the channel branding.
    #[instrument(skip_all)]
    pub async fn refresh_stats(&self) -> Result<()> {
        let complete = self.state.channels.lock().await.is_complete();
        if !complete {
            if let Err(err) = self.ensure_display_channels().await {
                warn!(?err, "could not resolve display channels");
            }
        }

        match self.youtube.channel_statistics(&self.settings.channel_id).await {
            Ok(stats) => {
                self.apply_stats(stats).await?;
                if let Err(err) = self.refresh_members().await {
                    warn!(?err, "member count refresh failed");
                }
            }
            Err(err) => error!(error = %err, "failed to fetch channel statistics"),
        }

        match self.youtube.channel_metadata(&self.settings.channel_id).await {
            Ok(meta) => *self.state.meta.lock().await = meta,
            Err(err) => error!(error = %err, "failed to fetch channel metadata"),
        }
        Ok(())
    }

    /// Rename stats surfaces whose shown value changed. Nothing is sent when the
    /// snapshot equals the last one.
    pub async fn apply_stats(&self, stats: StatsSnapshot) -> Result<()> {
        if !self.state.stats.lock().await.differs(&stats) {
            debug!(?stats, "statistics unchanged");
            return Ok(());
        }
        let channels = self.list_channels().await?;
        let store = self.state.channels.lock().await.clone();
        for (role, name) in stats_names(&stats, self.settings.subs_goal) {
            let Some(channel) = find_surface(&channels, store.get(role)) else {
                continue;
            };
            self.rename_surface(channel, &name, "Update YouTube statistics")
                .await;
        }
        self.state.stats.lock().await.observe(&stats);
        Ok(())
    }

    /// Poll the guild member count and mirror it onto its surface. Stands in
    /// for join/leave events, which need a gateway connection.
    #[instrument(skip_all)]
    pub async fn refresh_members(&self) -> Result<()> {
        let Some(id) = self.state.channels.lock().await.get(DisplayRole::Members) else {
            return Ok(());
        };
        let count = self
            .chat
            .member_count()
            .await
            .context("failed to read member count")?;
        if !self.state.members.lock().await.differs(&count) {
            return Ok(());
        }
        let channels = self.list_channels().await?;
        if let Some(channel) = find_surface(&channels, Some(id)) {
            self.rename_surface(channel, &members_name(count), "Member count change")
                .await;
        }
        self.state.members.lock().await.observe(&count);
        Ok(())
    }

    /// Classify the live page and act on transitions between resolved states.
    /// Returns the new state when a transition happened.
    #[instrument(skip_all)]
    pub async fn poll_live(&self) -> Result<Option<LiveState>> {
        let Some(live_id) = self.state.channels.lock().await.get(DisplayRole::Live) else {
            return Ok(None);
        };
        let markup = self
            .youtube
            .fetch_live_page(&self.settings.channel_id)
            .await
            .context("live check failed")?;

        let state = self.classifier.classify(&markup).await;
        if state == LiveState::Unknown {
            info!("live status inconclusive; keeping previous state");
            return Ok(None);
        }
        if !self.state.live.lock().await.is_transition(state) {
            return Ok(None);
        }
        // The transition is only recorded once the surfaces can be reached.
        let channels = self.list_channels().await?;
        self.state.live.lock().await.observe(state);
        info!(state = state.as_str(), "live state changed");

        if let Some(channel) = find_surface(&channels, Some(live_id)) {
            self.rename_surface(channel, live_name(state), "Update live status")
                .await;
        }
        self.send_live_alert(state).await;
        Ok(Some(state))
    }

    async fn send_live_alert(&self, state: LiveState) {
        let target = self.settings.live_alert_channel_id;
        if target == 0 {
            return;
        }
        let meta = self.state.meta.lock().await.clone();
        let message = live_alert_message(state, &meta, &self.settings.channel_id);
        match self.chat.send_message(target, &message).await {
            Ok(message_id) => {
                info!(state = state.as_str(), "sent live state notification");
                let chat = Arc::clone(&self.chat);
                let ttl = self.settings.alert_ttl;
                tokio::spawn(async move {
                    tokio::time::sleep(ttl).await;
                    if let Err(err) = chat.delete_message(target, message_id).await {
                        warn!(error = %err, "failed to delete live notification");
                    }
                });
            }
            Err(err) if err.is_forbidden() => {
                error!(error = %err, "missing permission to send in live alert channel")
            }
            Err(err) => error!(error = %err, "failed to send live notification"),
        }
    }

    async fn list_channels(&self) -> Result<Vec<GuildChannel>> {
        self.chat
            .list_channels()
            .await
            .context("failed to list guild channels")
    }

    /// Rename when the shown name differs; permission errors only skip this surface.
    async fn rename_surface(&self, channel: &GuildChannel, name: &str, reason: &str) {
        if channel.name == name {
            return;
        }
        match self.chat.rename_channel(channel.id, name, reason).await {
            Ok(()) => {
                debug!(from = %channel.name, to = name, "renamed display channel");
                ensure_read_only(self.chat.as_ref(), channel).await;
            }
            Err(err) if err.is_forbidden() => {
                error!(error = %err, channel = %channel.name, "missing permission to edit channel")
            }
            Err(err) => error!(error = %err, channel = %channel.name, "failed to rename channel"),
        }
    }
}

fn find_surface(channels: &[GuildChannel], id: Option<u64>) -> Option<&GuildChannel> {
    let id = id?;
    channels
        .iter()
        .find(|c| c.id == id && c.kind == ChannelKind::Voice)
}
