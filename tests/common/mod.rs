#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;

use yt_mirrorbot::bot::{BotSettings, MirrorBot};
use yt_mirrorbot::channels::ChannelIdStore;
use yt_mirrorbot::discord::{ChannelKind, ChatPlatform, GuildChannel, PermissionOverwrite};
use yt_mirrorbot::discord::{CONNECT, VIEW_CHANNEL};
use yt_mirrorbot::embed::OutgoingMessage;
use yt_mirrorbot::error::{FetchError, PlatformError};
use yt_mirrorbot::live::LiveClassifier;
use yt_mirrorbot::model::{ChannelMeta, DisplayRole, LiveState, StatsSnapshot};
use yt_mirrorbot::queue::ReminderQueue;
use yt_mirrorbot::state::AppState;
use yt_mirrorbot::youtube::YouTubeService;

pub const GUILD: u64 = 1000;
pub const REMINDER_CHANNEL: u64 = 2000;
pub const ALERT_CHANNEL: u64 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub name: String,
    pub kind: ChannelKind,
    pub parent: Option<u64>,
}

#[derive(Default)]
pub struct RecordingChat {
    pub channels: Mutex<Vec<GuildChannel>>,
    pub created: Mutex<Vec<Created>>,
    pub renames: Mutex<Vec<(u64, String)>>,
    pub permissions: Mutex<Vec<(u64, PermissionOverwrite)>>,
    pub sent: Mutex<Vec<(u64, OutgoingMessage)>>,
    pub deleted: Mutex<Vec<(u64, u64)>>,
    pub members: Mutex<u64>,
    pub forbid_send: Mutex<bool>,
    /// Number of upcoming `list_channels` calls that fail with a 502.
    pub failing_lists: Mutex<usize>,
    next_id: AtomicU64,
}

impl RecordingChat {
    pub fn new() -> Arc<Self> {
        let chat = Self::default();
        chat.next_id.store(10_000, Ordering::SeqCst);
        Arc::new(chat)
    }

    pub async fn with_channels(channels: Vec<GuildChannel>) -> Arc<Self> {
        let chat = Self::new();
        *chat.channels.lock().await = channels;
        chat
    }

    pub async fn renames(&self) -> Vec<(u64, String)> {
        self.renames.lock().await.clone()
    }

    pub async fn sent(&self) -> Vec<(u64, OutgoingMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn created(&self) -> Vec<Created> {
        self.created.lock().await.clone()
    }
}

/// A voice channel already configured as read-only.
pub fn read_only_voice(id: u64, name: &str) -> GuildChannel {
    GuildChannel {
        id,
        kind: ChannelKind::Voice,
        name: name.to_string(),
        parent_id: None,
        permission_overwrites: vec![PermissionOverwrite {
            id: GUILD,
            kind: 0,
            allow: VIEW_CHANNEL,
            deny: CONNECT,
        }],
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    fn guild_id(&self) -> u64 {
        GUILD
    }

    async fn list_channels(&self) -> Result<Vec<GuildChannel>, PlatformError> {
        let mut failing = self.failing_lists.lock().await;
        if *failing > 0 {
            *failing -= 1;
            return Err(PlatformError::Http {
                status: StatusCode::BAD_GATEWAY,
                body: "upstream".into(),
            });
        }
        Ok(self.channels.lock().await.clone())
    }

    async fn create_channel(
        &self,
        name: &str,
        kind: ChannelKind,
        parent_id: Option<u64>,
        _reason: &str,
    ) -> Result<GuildChannel, PlatformError> {
        let channel = GuildChannel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            kind,
            name: name.to_string(),
            parent_id,
            permission_overwrites: Vec::new(),
        };
        self.created.lock().await.push(Created {
            name: name.to_string(),
            kind,
            parent: parent_id,
        });
        self.channels.lock().await.push(channel.clone());
        Ok(channel)
    }

    async fn rename_channel(
        &self,
        channel_id: u64,
        name: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.renames
            .lock()
            .await
            .push((channel_id, name.to_string()));
        if let Some(c) = self
            .channels
            .lock()
            .await
            .iter_mut()
            .find(|c| c.id == channel_id)
        {
            c.name = name.to_string();
        }
        Ok(())
    }

    async fn edit_permissions(
        &self,
        channel_id: u64,
        overwrite: &PermissionOverwrite,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.permissions
            .lock()
            .await
            .push((channel_id, overwrite.clone()));
        if let Some(c) = self
            .channels
            .lock()
            .await
            .iter_mut()
            .find(|c| c.id == channel_id)
        {
            c.permission_overwrites.retain(|o| o.id != overwrite.id);
            c.permission_overwrites.push(overwrite.clone());
        }
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: u64,
        message: &OutgoingMessage,
    ) -> Result<u64, PlatformError> {
        if *self.forbid_send.lock().await {
            return Err(PlatformError::Forbidden(format!("send in {}", channel_id)));
        }
        let mut sent = self.sent.lock().await;
        sent.push((channel_id, message.clone()));
        Ok(sent.len() as u64)
    }

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<(), PlatformError> {
        self.deleted.lock().await.push((channel_id, message_id));
        Ok(())
    }

    async fn member_count(&self) -> Result<u64, PlatformError> {
        Ok(*self.members.lock().await)
    }
}

#[derive(Default)]
pub struct FakeYouTube {
    pub stats: Mutex<Option<StatsSnapshot>>,
    pub meta: Mutex<Option<ChannelMeta>>,
    pub feeds: Mutex<VecDeque<String>>,
    pub live_page: Mutex<Option<String>>,
}

fn unavailable() -> FetchError {
    FetchError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "fake".into(),
    }
}

impl FakeYouTube {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn push_feed(&self, markup: String) {
        self.feeds.lock().await.push_back(markup);
    }
}

#[async_trait]
impl YouTubeService for FakeYouTube {
    async fn channel_statistics(&self, _channel_id: &str) -> Result<StatsSnapshot, FetchError> {
        self.stats.lock().await.ok_or_else(unavailable)
    }

    async fn channel_metadata(&self, _channel_id: &str) -> Result<ChannelMeta, FetchError> {
        self.meta.lock().await.clone().ok_or_else(unavailable)
    }

    async fn fetch_feed(&self, _channel_id: &str) -> Result<String, FetchError> {
        self.feeds.lock().await.pop_front().ok_or_else(unavailable)
    }

    async fn fetch_live_page(&self, _channel_id: &str) -> Result<String, FetchError> {
        self.live_page.lock().await.clone().ok_or_else(unavailable)
    }
}

/// Classifier returning a scripted state.
pub struct ScriptedClassifier {
    pub state: Mutex<LiveState>,
}

impl ScriptedClassifier {
    pub fn new(state: LiveState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub async fn set(&self, state: LiveState) {
        *self.state.lock().await = state;
    }
}

#[async_trait]
impl LiveClassifier for ScriptedClassifier {
    async fn classify(&self, _markup: &str) -> LiveState {
        *self.state.lock().await
    }
}

pub fn settings(data_dir: &Path) -> BotSettings {
    BotSettings {
        channel_id: "UC1".into(),
        category_name: "YouTube Stats".into(),
        subs_goal: 1000,
        reminder_channel_id: REMINDER_CHANNEL,
        live_alert_channel_id: ALERT_CHANNEL,
        feed_cache_path: data_dir.join("rss_cache.json"),
        alert_ttl: Duration::from_millis(20),
    }
}

pub fn build_bot(
    settings: BotSettings,
    youtube: Arc<FakeYouTube>,
    chat: Arc<RecordingChat>,
    classifier: Arc<ScriptedClassifier>,
    channels: ChannelIdStore,
) -> MirrorBot {
    MirrorBot::new(
        settings,
        youtube,
        chat,
        classifier,
        AppState::with_queue(channels, ReminderQueue::with_seed(11)),
    )
}

/// Surfaces 1..=6 registered for every role, named after the given stats.
pub async fn registered_surfaces(names: [&str; 6]) -> (Vec<GuildChannel>, ChannelIdStore) {
    let mut store = ChannelIdStore::in_memory();
    let mut channels = Vec::new();
    for (i, role) in DisplayRole::ALL.into_iter().enumerate() {
        let id = i as u64 + 1;
        store.set(role, id);
        channels.push(read_only_voice(id, names[i]));
    }
    (channels, store)
}

pub fn feed_xml(entries: &[(&str, &str, Option<&str>)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
"#,
    );
    for (id, title, thumb) in entries {
        xml.push_str(&format!(
            "<entry><yt:videoId>{id}</yt:videoId><title>{title}</title>\
             <link rel=\"alternate\" href=\"https://www.youtube.com/watch?v={id}\"/>"
        ));
        if let Some(thumb) = thumb {
            xml.push_str(&format!(
                "<media:group><media:thumbnail url=\"{thumb}\"/></media:group>"
            ));
        }
        xml.push_str("</entry>\n");
    }
    xml.push_str("</feed>");
    xml
}
