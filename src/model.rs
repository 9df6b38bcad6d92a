use serde::{Deserialize, Deserializer, Serialize};

/// One uploaded video as observed in the channel feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub link: String,
    #[serde(rename = "thumb", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeedEntry {
    /// Link to the entry, falling back to the canonical watch URL.
    pub fn watch_url(&self) -> String {
        if self.link.is_empty() {
            format!("https://www.youtube.com/watch?v={}", self.id)
        } else {
            self.link.clone()
        }
    }

    pub fn thumbnail_url(&self) -> String {
        match self.thumbnail.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub subscribers: u64,
    pub views: u64,
    pub video_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LiveState {
    Live,
    Upcoming,
    Offline,
    Unknown,
}

impl LiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveState::Live => "live",
            LiveState::Upcoming => "upcoming",
            LiveState::Offline => "offline",
            LiveState::Unknown => "unknown",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, LiveState::Unknown)
    }
}

/// Logical role of a display surface (a read-only voice channel).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DisplayRole {
    Subs,
    Views,
    Videos,
    Goal,
    Members,
    Live,
}

impl DisplayRole {
    pub const ALL: [DisplayRole; 6] = [
        DisplayRole::Subs,
        DisplayRole::Views,
        DisplayRole::Videos,
        DisplayRole::Goal,
        DisplayRole::Members,
        DisplayRole::Live,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayRole::Subs => "subs",
            DisplayRole::Views => "views",
            DisplayRole::Videos => "videos",
            DisplayRole::Goal => "goal",
            DisplayRole::Members => "members",
            DisplayRole::Live => "live",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == name)
    }

    /// Name given to a freshly created surface.
    pub fn default_name(&self) -> &'static str {
        match self {
            DisplayRole::Subs => "📊 Subs: 0",
            DisplayRole::Views => "👁️ Views: 0",
            DisplayRole::Videos => "🎞️ Videos: 0",
            DisplayRole::Goal => "🎯 Goal: 0",
            DisplayRole::Members => "👥 Members: 0",
            DisplayRole::Live => "🔴 OFFLINE",
        }
    }
}

/// Channel branding shown in embeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelMeta {
    pub title: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub channel_url: Option<String>,
}

impl ChannelMeta {
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("YouTube Channel")
    }

    pub fn channel_url_or(&self, channel_id: &str) -> String {
        self.channel_url
            .clone()
            .unwrap_or_else(|| channel_url(channel_id))
    }
}

pub fn channel_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/channel/{}", channel_id)
}
