//! Message payloads and display-surface names.
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::model::{ChannelMeta, DisplayRole, FeedEntry, LiveState, StatsSnapshot};

pub const PURPLE: u32 = 0x9b59b6;
pub const RED: u32 = 0xe74c3c;
pub const GOLD: u32 = 0xf1c40f;
pub const DARK_GREY: u32 = 0x607d8b;

const REMINDER_CAPTIONS: [&str; 5] = [
    "From the vault—give this a watch!",
    "Throwback upload you might have missed!",
    "ICYMI: a classic from the channel!",
    "Reminder: this video is worth revisiting!",
    "Rewatch time! Check this out!",
];

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedMedia {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub url: String,
}

impl ActionRow {
    /// A row holding a single link-styled button.
    pub fn link_button(label: &str, url: &str) -> Self {
        Self {
            kind: 1,
            components: vec![Button {
                kind: 2,
                style: 5,
                label: label.to_string(),
                url: url.to_string(),
            }],
        }
    }
}

fn author_block(meta: &ChannelMeta, channel_id: &str) -> EmbedAuthor {
    EmbedAuthor {
        name: meta.title_or_default().to_string(),
        url: meta.channel_url_or(channel_id),
        icon_url: meta.avatar_url.clone(),
    }
}

pub fn random_caption() -> &'static str {
    REMINDER_CAPTIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(REMINDER_CAPTIONS[0])
}

/// Branded "old video" reminder with a Watch button.
pub fn reminder_message(
    entry: &FeedEntry,
    meta: &ChannelMeta,
    channel_id: &str,
    caption: &str,
) -> OutgoingMessage {
    let url = entry.watch_url();
    let title = if entry.title.is_empty() {
        "Video".to_string()
    } else {
        entry.title.clone()
    };
    let embed = Embed {
        title,
        description: Some(caption.to_string()),
        url: Some(url.clone()),
        color: PURPLE,
        timestamp: Some(Utc::now()),
        author: Some(author_block(meta, channel_id)),
        image: meta.banner_url.clone().map(|url| EmbedMedia { url }),
        thumbnail: Some(EmbedMedia {
            url: entry.thumbnail_url(),
        }),
    };
    OutgoingMessage {
        content: None,
        embeds: vec![embed],
        components: vec![ActionRow::link_button("Watch", &url)],
    }
}

/// `@everyone` notification for a live-state transition.
pub fn live_alert_message(
    state: LiveState,
    meta: &ChannelMeta,
    channel_id: &str,
) -> OutgoingMessage {
    let (title, color) = match state {
        LiveState::Live => ("🔴 The channel is now LIVE!", RED),
        LiveState::Upcoming => ("🟡 A stream is scheduled!", GOLD),
        LiveState::Offline | LiveState::Unknown => ("⚫ The channel went offline.", DARK_GREY),
    };
    let embed = Embed {
        title: title.to_string(),
        description: Some(format!(
            "[Click here to visit the channel]({})",
            meta.channel_url_or(channel_id)
        )),
        url: None,
        color,
        timestamp: Some(Utc::now()),
        author: Some(author_block(meta, channel_id)),
        image: None,
        thumbnail: None,
    };
    OutgoingMessage {
        content: Some("@everyone".to_string()),
        embeds: vec![embed],
        components: Vec::new(),
    }
}

/// `1234567` → `1,234,567`.
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn stats_names(stats: &StatsSnapshot, subs_goal: u64) -> [(DisplayRole, String); 4] {
    [
        (DisplayRole::Subs, format!("📊 Subs: {}", fmt_num(stats.subscribers))),
        (DisplayRole::Views, format!("👁️ Views: {}", fmt_num(stats.views))),
        (DisplayRole::Videos, format!("🎞️ Videos: {}", fmt_num(stats.video_count))),
        (DisplayRole::Goal, format!("🎯 Goal: {}", fmt_num(subs_goal))),
    ]
}

pub fn members_name(count: u64) -> String {
    format!("👥 Members: {}", fmt_num(count))
}

pub fn live_name(state: LiveState) -> &'static str {
    match state {
        LiveState::Live => "🟢 LIVE",
        LiveState::Upcoming => "🟡 UPCOMING",
        LiveState::Offline | LiveState::Unknown => "🔴 OFFLINE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(999), "999");
        assert_eq!(fmt_num(1000), "1,000");
        assert_eq!(fmt_num(1234567), "1,234,567");
    }

    #[test]
    fn reminder_payload_shape() {
        let entry = FeedEntry {
            id: "abc".into(),
            title: "Clip".into(),
            link: "https://www.youtube.com/watch?v=abc".into(),
            thumbnail: None,
        };
        let meta = ChannelMeta {
            title: Some("Chan".into()),
            banner_url: Some("https://banner=w2480".into()),
            ..Default::default()
        };
        let msg = reminder_message(&entry, &meta, "UC1", "caption");
        let json = serde_json::to_value(&msg).unwrap();
        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "Clip");
        assert_eq!(embed["color"], PURPLE);
        assert_eq!(embed["author"]["name"], "Chan");
        assert_eq!(embed["author"]["url"], "https://www.youtube.com/channel/UC1");
        assert!(embed["author"].get("icon_url").is_none());
        assert_eq!(embed["image"]["url"], "https://banner=w2480");
        assert_eq!(embed["thumbnail"]["url"], "https://i.ytimg.com/vi/abc/hqdefault.jpg");
        let button = &json["components"][0]["components"][0];
        assert_eq!(button["style"], 5);
        assert_eq!(button["label"], "Watch");
        assert_eq!(button["url"], "https://www.youtube.com/watch?v=abc");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn live_alert_mentions_everyone() {
        let msg = live_alert_message(LiveState::Upcoming, &ChannelMeta::default(), "UC1");
        assert_eq!(msg.content.as_deref(), Some("@everyone"));
        assert_eq!(msg.embeds[0].color, GOLD);
        assert_eq!(msg.embeds[0].author.as_ref().unwrap().name, "YouTube Channel");
        assert!(msg.components.is_empty());
    }

    #[test]
    fn display_names() {
        let stats = StatsSnapshot {
            subscribers: 1500,
            views: 20,
            video_count: 3,
        };
        let names = stats_names(&stats, 2000);
        assert_eq!(names[0].1, "📊 Subs: 1,500");
        assert_eq!(names[3].1, "🎯 Goal: 2,000");
        assert_eq!(members_name(42), "👥 Members: 42");
        assert_eq!(live_name(LiveState::Live), "🟢 LIVE");
    }

    #[test]
    fn captions_come_from_the_list() {
        assert!(REMINDER_CAPTIONS.contains(&random_caption()));
    }
}
