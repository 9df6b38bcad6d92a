//! Configuration loader and validator for the YouTube→Discord mirror bot.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    pub discord: Discord,
    pub youtube: YouTube,
    #[serde(default)]
    pub schedule: Schedule,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Discord bot settings. Channel ids of `0` disable the matching feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discord {
    #[serde(default)]
    pub bot_token: String,
    pub guild_id: u64,
    #[serde(default = "default_category")]
    pub category_name: String,
    #[serde(default)]
    pub live_alert_channel_id: u64,
    #[serde(default)]
    pub reminder_channel_id: u64,
}

/// YouTube channel being mirrored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YouTube {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default = "default_subs_goal")]
    pub subs_goal: u64,
}

/// Polling intervals in minutes. The live-status poll is fixed, see [`LIVE_POLL_INTERVAL`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    #[serde(default = "default_stats_interval")]
    pub stats_interval_min: u64,
    #[serde(default = "default_feed_interval")]
    pub feed_refresh_min: u64,
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_min: u64,
    #[serde(default = "default_members_interval")]
    pub members_interval_min: u64,
}

pub const LIVE_POLL_INTERVAL: Duration = Duration::from_secs(90);

fn default_data_dir() -> String {
    "./data".into()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_category() -> String {
    "YouTube Stats".into()
}
fn default_subs_goal() -> u64 {
    1000
}
fn default_stats_interval() -> u64 {
    720
}
fn default_feed_interval() -> u64 {
    60
}
fn default_reminder_interval() -> u64 {
    1
}
fn default_members_interval() -> u64 {
    5
}

impl Default for App {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            stats_interval_min: default_stats_interval(),
            feed_refresh_min: default_feed_interval(),
            reminder_interval_min: default_reminder_interval(),
            members_interval_min: default_members_interval(),
        }
    }
}

impl App {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(self.data_dir.trim())
    }

    pub fn feed_cache_path(&self) -> PathBuf {
        self.data_path().join("rss_cache.json")
    }

    pub fn channel_ids_path(&self) -> PathBuf {
        self.data_path().join("channel_ids.json")
    }

    pub fn live_dump_path(&self) -> PathBuf {
        self.data_path().join("debug_live.html")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Schedule {
    pub fn stats_interval(&self) -> Duration {
        minutes(self.stats_interval_min)
    }
    pub fn feed_interval(&self) -> Duration {
        minutes(self.feed_refresh_min)
    }
    pub fn reminder_interval(&self) -> Duration {
        minutes(self.reminder_interval_min)
    }
    pub fn members_interval(&self) -> Duration {
        minutes(self.members_interval_min)
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.data_path())
    }

    /// Secrets and the channel id may come from the environment instead of the file.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty("DISCORD_TOKEN") {
            self.discord.bot_token = token;
        }
        if let Some(key) = non_empty("YOUTUBE_API_KEY") {
            self.youtube.api_key = key;
        }
        if let Some(id) = non_empty("YOUTUBE_CHANNEL_ID") {
            self.youtube.channel_id = id;
        }
    }
}

/// Load configuration from a YAML file, apply env overrides and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env_overrides();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_secs must be > 0"));
    }

    if cfg.discord.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("discord.bot_token must be non-empty"));
    }
    if cfg.discord.guild_id == 0 {
        return Err(ConfigError::Invalid("discord.guild_id must be set"));
    }

    if cfg.youtube.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("youtube.api_key must be non-empty"));
    }
    if cfg.youtube.channel_id.trim().is_empty() {
        return Err(ConfigError::Invalid("youtube.channel_id must be non-empty"));
    }

    let s = &cfg.schedule;
    if s.stats_interval_min == 0 {
        return Err(ConfigError::Invalid("schedule.stats_interval_min must be > 0"));
    }
    if s.feed_refresh_min == 0 {
        return Err(ConfigError::Invalid("schedule.feed_refresh_min must be > 0"));
    }
    if s.reminder_interval_min == 0 {
        return Err(ConfigError::Invalid("schedule.reminder_interval_min must be > 0"));
    }
    if s.members_interval_min == 0 {
        return Err(ConfigError::Invalid("schedule.members_interval_min must be > 0"));
    }

    Ok(())
}

/// Returns an example YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  request_timeout_secs: 15

discord:
  bot_token: "YOUR_DISCORD_BOT_TOKEN"
  guild_id: 123456789012345678
  category_name: "YouTube Stats"
  live_alert_channel_id: 223456789012345678
  reminder_channel_id: 323456789012345678

youtube:
  api_key: "YOUR_YOUTUBE_DATA_API_KEY"
  channel_id: "UCxxxxxxxxxxxxxxxxxxxxxx"
  subs_goal: 1000

schedule:
  stats_interval_min: 720
  feed_refresh_min: 60
  reminder_interval_min: 1
  members_interval_min: 5
"#
}
