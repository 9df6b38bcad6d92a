//! Display surfaces: persisted role → channel id map, and lookup/creation of
//! the read-only voice channels that show the mirrored values.
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::discord::{
    ChannelKind, ChatPlatform, GuildChannel, PermissionOverwrite, CONNECT, VIEW_CHANNEL,
};
use crate::error::PlatformError;
use crate::model::DisplayRole;

const LIVE_NAMES: [&str; 3] = ["🟢 LIVE", "🟡 UPCOMING", "🔴 OFFLINE"];

#[derive(Debug, Clone, Default)]
pub struct ChannelIdStore {
    ids: BTreeMap<DisplayRole, u64>,
    path: Option<PathBuf>,
}

impl ChannelIdStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load persisted ids. Unknown roles, non-numeric values and unreadable
    /// files are ignored.
    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            ids: BTreeMap::new(),
            path: Some(path.clone()),
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => return store,
        };
        let raw: HashMap<String, Value> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %path.display(),
                    "failed to parse channel id store; starting empty"
                );
                return store;
            }
        };
        for (key, value) in raw {
            let id = match &value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            };
            match (DisplayRole::from_name(&key), id) {
                (Some(role), Some(id)) if id != 0 => {
                    store.ids.insert(role, id);
                }
                _ => debug!(%key, "ignoring channel id entry"),
            }
        }
        store
    }

    pub fn get(&self, role: DisplayRole) -> Option<u64> {
        self.ids.get(&role).copied()
    }

    pub fn set(&mut self, role: DisplayRole, id: u64) {
        self.ids.insert(role, id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        DisplayRole::ALL.iter().all(|role| self.ids.contains_key(role))
    }

    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("channel id store is in-memory only; skipping persist");
            return Ok(());
        };
        let map: BTreeMap<&str, u64> = self.ids.iter().map(|(r, id)| (r.as_str(), *id)).collect();
        let bytes = serde_json::to_vec_pretty(&map).context("serialize channel ids")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

fn in_category(channel: &GuildChannel, category: Option<u64>) -> bool {
    category.is_none() || channel.parent_id == category
}

/// Voice channel named exactly `name`, else one starting with the part of
/// `name` before the first `:`.
pub fn find_by_name_or_prefix<'a>(
    channels: &'a [GuildChannel],
    category: Option<u64>,
    name: &str,
) -> Option<&'a GuildChannel> {
    let prefix = name.split_once(':').map(|(p, _)| p).unwrap_or(name);
    let voice = || {
        channels
            .iter()
            .filter(move |c| c.kind == ChannelKind::Voice && in_category(c, category))
    };
    voice()
        .find(|c| c.name == name)
        .or_else(|| voice().find(|c| c.name.starts_with(prefix)))
}

fn find_existing<'a>(
    channels: &'a [GuildChannel],
    category: Option<u64>,
    role: DisplayRole,
) -> Option<&'a GuildChannel> {
    if role == DisplayRole::Live {
        if let Some(found) = LIVE_NAMES
            .iter()
            .find_map(|name| find_by_name_or_prefix(channels, category, name))
        {
            return Some(found);
        }
    }
    find_by_name_or_prefix(channels, category, role.default_name())
}

/// Make a surface visible but not joinable for `@everyone`. No call is made
/// when the overwrite is already in place.
pub async fn ensure_read_only(chat: &dyn ChatPlatform, channel: &GuildChannel) {
    let everyone = chat.guild_id();
    let (allow, deny) = channel
        .overwrite_for(everyone)
        .map(|o| (o.allow, o.deny))
        .unwrap_or((0, 0));
    let wanted = PermissionOverwrite {
        id: everyone,
        kind: 0,
        allow: (allow | VIEW_CHANNEL) & !CONNECT,
        deny: (deny | CONNECT) & !VIEW_CHANNEL,
    };
    if wanted.allow == allow && wanted.deny == deny {
        return;
    }
    match chat
        .edit_permissions(channel.id, &wanted, "Read-only stats channel")
        .await
    {
        Ok(()) => debug!(channel = %channel.name, "set read-only overwrite"),
        Err(err @ PlatformError::Forbidden(_)) => {
            error!(error = %err, channel = %channel.name, "cannot make channel read-only")
        }
        Err(err) => error!(error = %err, channel = %channel.name, "failed to set overwrite"),
    }
}

async fn resolve_category(
    chat: &dyn ChatPlatform,
    channels: &[GuildChannel],
    name: &str,
) -> Option<u64> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if let Some(existing) = channels
        .iter()
        .find(|c| c.kind == ChannelKind::Category && c.name == name)
    {
        return Some(existing.id);
    }
    match chat
        .create_channel(name, ChannelKind::Category, None, "Create YouTube stats category")
        .await
    {
        Ok(created) => {
            info!(category = name, id = created.id, "created category");
            Some(created.id)
        }
        Err(err @ PlatformError::Forbidden(_)) => {
            warn!(error = %err, category = name, "cannot create category");
            None
        }
        Err(err) => {
            error!(error = %err, category = name, "failed to create category");
            None
        }
    }
}

/// Find or create every display surface and persist the resulting ids.
///
/// Stored ids are preferred; a stale id falls through to a name search and
/// finally to creating the channel. Roles that cannot be resolved keep their
/// previous id.
#[instrument(skip_all)]
pub async fn resolve_display_channels(
    chat: &dyn ChatPlatform,
    store: &mut ChannelIdStore,
    category_name: &str,
) -> Result<()> {
    let channels = chat
        .list_channels()
        .await
        .context("failed to list guild channels")?;
    let category = resolve_category(chat, &channels, category_name).await;

    for role in DisplayRole::ALL {
        let by_id = store.get(role).and_then(|id| {
            channels
                .iter()
                .find(|c| c.id == id && c.kind == ChannelKind::Voice)
        });
        let channel = match by_id.or_else(|| find_existing(&channels, category, role)) {
            Some(existing) => existing.clone(),
            None => {
                let reason = format!("Create {} stats voice channel", role.as_str());
                match chat
                    .create_channel(role.default_name(), ChannelKind::Voice, category, &reason)
                    .await
                {
                    Ok(created) => {
                        info!(role = role.as_str(), id = created.id, "created voice channel");
                        created
                    }
                    Err(err) => {
                        error!(
                            error = %err,
                            role = role.as_str(),
                            "failed to create voice channel"
                        );
                        continue;
                    }
                }
            }
        };
        ensure_read_only(chat, &channel).await;
        store.set(role, channel.id);
    }

    if let Err(err) = store.persist().await {
        error!(?err, "failed to persist channel ids");
    }
    Ok(())
}
