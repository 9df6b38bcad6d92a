use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::embed::OutgoingMessage;
use crate::error::PlatformError;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10/";

pub const VIEW_CHANNEL: u64 = 1 << 10;
pub const CONNECT: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Other(u8),
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            0 => ChannelKind::Text,
            2 => ChannelKind::Voice,
            4 => ChannelKind::Category,
            other => ChannelKind::Other(other),
        }
    }
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Text => 0,
            ChannelKind::Voice => 2,
            ChannelKind::Category => 4,
            ChannelKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    #[serde(deserialize_with = "snowflake", serialize_with = "as_string")]
    pub id: u64,
    /// 0 = role, 1 = member.
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(deserialize_with = "snowflake", serialize_with = "as_string", default)]
    pub allow: u64,
    #[serde(deserialize_with = "snowflake", serialize_with = "as_string", default)]
    pub deny: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildChannel {
    #[serde(deserialize_with = "snowflake", serialize_with = "as_string")]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

impl GuildChannel {
    pub fn overwrite_for(&self, target: u64) -> Option<&PermissionOverwrite> {
        self.permission_overwrites.iter().find(|o| o.id == target)
    }
}

/// Guild-scoped operations on the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    fn guild_id(&self) -> u64;

    async fn list_channels(&self) -> Result<Vec<GuildChannel>, PlatformError>;

    async fn create_channel(
        &self,
        name: &str,
        kind: ChannelKind,
        parent_id: Option<u64>,
        reason: &str,
    ) -> Result<GuildChannel, PlatformError>;

    async fn rename_channel(
        &self,
        channel_id: u64,
        name: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn edit_permissions(
        &self,
        channel_id: u64,
        overwrite: &PermissionOverwrite,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Returns the id of the created message.
    async fn send_message(
        &self,
        channel_id: u64,
        message: &OutgoingMessage,
    ) -> Result<u64, PlatformError>;

    async fn delete_message(&self, channel_id: u64, message_id: u64)
        -> Result<(), PlatformError>;

    async fn member_count(&self) -> Result<u64, PlatformError>;
}

#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    base_url: Url,
    token: String,
    guild_id: u64,
}

impl fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    #[serde(deserialize_with = "snowflake")]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GuildWithCounts {
    #[serde(default)]
    approximate_member_count: Option<u64>,
    #[serde(default)]
    member_count: Option<u64>,
}

impl DiscordClient {
    pub fn new(token: String, guild_id: u64, timeout: Duration) -> Result<Self, PlatformError> {
        let base_url = Url::parse(DISCORD_API_BASE).map_err(|err| PlatformError::Http {
            status: StatusCode::BAD_REQUEST,
            body: err.to_string(),
        })?;
        Self::with_base_url(token, guild_id, timeout, base_url)
    }

    pub fn with_base_url(
        token: String,
        guild_id: u64,
        timeout: Duration,
        base_url: Url,
    ) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .user_agent("DiscordBot (https://github.com, 0.1) yt-mirrorbot")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
            guild_id,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, PlatformError> {
        let url = self.base_url.join(path).map_err(|err| PlatformError::Http {
            status: StatusCode::BAD_REQUEST,
            body: format!("invalid path {}: {}", path, err),
        })?;
        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token)))
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<reqwest::Response, PlatformError> {
        let res = request.send().await?;
        let status = res.status();
        if status == StatusCode::FORBIDDEN {
            return Err(PlatformError::Forbidden(action.to_string()));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PlatformError::Http { status, body });
        }
        debug!(action, %status, "discord request ok");
        Ok(res)
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, PlatformError> {
        let res = self.execute(request, action).await?;
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    fn guild_id(&self) -> u64 {
        self.guild_id
    }

    async fn list_channels(&self) -> Result<Vec<GuildChannel>, PlatformError> {
        let req = self.request(Method::GET, &format!("guilds/{}/channels", self.guild_id))?;
        self.execute_json(req, "list guild channels").await
    }

    async fn create_channel(
        &self,
        name: &str,
        kind: ChannelKind,
        parent_id: Option<u64>,
        reason: &str,
    ) -> Result<GuildChannel, PlatformError> {
        let mut body = json!({ "name": name, "type": u8::from(kind) });
        if let Some(parent) = parent_id {
            body["parent_id"] = Value::String(parent.to_string());
        }
        let req = self
            .request(Method::POST, &format!("guilds/{}/channels", self.guild_id))?
            .header("X-Audit-Log-Reason", reason)
            .json(&body);
        self.execute_json(req, &format!("create channel {}", name))
            .await
    }

    async fn rename_channel(
        &self,
        channel_id: u64,
        name: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let req = self
            .request(Method::PATCH, &format!("channels/{}", channel_id))?
            .header("X-Audit-Log-Reason", reason)
            .json(&json!({ "name": name }));
        self.execute(req, &format!("rename channel {}", channel_id))
            .await?;
        Ok(())
    }

    async fn edit_permissions(
        &self,
        channel_id: u64,
        overwrite: &PermissionOverwrite,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let req = self
            .request(
                Method::PUT,
                &format!("channels/{}/permissions/{}", channel_id, overwrite.id),
            )?
            .header("X-Audit-Log-Reason", reason)
            .json(&json!({
                "type": overwrite.kind,
                "allow": overwrite.allow.to_string(),
                "deny": overwrite.deny.to_string(),
            }));
        self.execute(req, &format!("set permissions on channel {}", channel_id))
            .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: u64,
        message: &OutgoingMessage,
    ) -> Result<u64, PlatformError> {
        let req = self
            .request(Method::POST, &format!("channels/{}/messages", channel_id))?
            .json(message);
        let created: CreatedMessage = self
            .execute_json(req, &format!("send in channel {}", channel_id))
            .await?;
        Ok(created.id)
    }

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<(), PlatformError> {
        let req = self.request(
            Method::DELETE,
            &format!("channels/{}/messages/{}", channel_id, message_id),
        )?;
        self.execute(req, &format!("delete message in channel {}", channel_id))
            .await?;
        Ok(())
    }

    async fn member_count(&self) -> Result<u64, PlatformError> {
        let req = self
            .request(Method::GET, &format!("guilds/{}", self.guild_id))?
            .query(&[("with_counts", "true")]);
        let guild: GuildWithCounts = self.execute_json(req, "read guild").await?;
        Ok(guild
            .approximate_member_count
            .or(guild.member_count)
            .unwrap_or(0))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Text(String),
    Number(u64),
}

impl RawSnowflake {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            RawSnowflake::Number(n) => Ok(n),
            RawSnowflake::Text(s) => s
                .parse()
                .map_err(|_| E::custom(format!("invalid snowflake: {}", s))),
        }
    }
}

/// Discord sends ids and permission bitsets as decimal strings.
fn snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    RawSnowflake::deserialize(deserializer)?.into_u64()
}

fn optional_snowflake<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Option::<RawSnowflake>::deserialize(deserializer)?
        .map(RawSnowflake::into_u64)
        .transpose()
}

fn as_string<S: serde::Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_guild_channel_payload() {
        let json = r#"{
            "id": "41771983423143937",
            "type": 2,
            "name": "📊 Subs: 12",
            "parent_id": "399942396007890945",
            "permission_overwrites": [
                {"id": "41771983423143936", "type": 0, "allow": "1024", "deny": "1048576"}
            ]
        }"#;
        let channel: GuildChannel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.id, 41771983423143937);
        assert_eq!(channel.kind, ChannelKind::Voice);
        assert_eq!(channel.parent_id, Some(399942396007890945));
        let ow = channel.overwrite_for(41771983423143936).unwrap();
        assert_eq!(ow.allow, VIEW_CHANNEL);
        assert_eq!(ow.deny, CONNECT);
    }

    #[test]
    fn parent_id_may_be_null() {
        let json = r#"{"id": "1", "type": 4, "name": "YouTube Stats", "parent_id": null}"#;
        let channel: GuildChannel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.kind, ChannelKind::Category);
        assert_eq!(channel.parent_id, None);
        assert!(channel.permission_overwrites.is_empty());
    }

    #[test]
    fn unknown_channel_types_survive() {
        let json = r#"{"id": "5", "type": 15, "name": "forum"}"#;
        let channel: GuildChannel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.kind, ChannelKind::Other(15));
    }
}
