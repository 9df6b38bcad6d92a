use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::feed::feed_url;
use crate::live::PageFetcher;
use crate::model::{channel_url, ChannelMeta, StatsSnapshot};

const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
const WEB_BASE: &str = "https://www.youtube.com";

const BROWSER_UA: &str = "Mozilla/5.0";
const CONSENT_COOKIE: &str = "CONSENT=YES+cb.20210420-15-p1.en-GB+FX+634";
const LIVE_PAGE_TIMEOUT: Duration = Duration::from_secs(12);

/// Read-only operations against the video platform.
#[async_trait]
pub trait YouTubeService: Send + Sync {
    async fn channel_statistics(&self, channel_id: &str) -> Result<StatsSnapshot, FetchError>;

    async fn channel_metadata(&self, channel_id: &str) -> Result<ChannelMeta, FetchError>;

    async fn fetch_feed(&self, channel_id: &str) -> Result<String, FetchError>;

    async fn fetch_live_page(&self, channel_id: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    api_base: Url,
    web_base: String,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ChannelList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StatisticsItem {
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    branding_settings: BrandingSettings,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    title: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BrandingSettings {
    #[serde(default)]
    image: BrandingImage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrandingImage {
    banner_external_url: Option<String>,
}

fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

impl YouTubeClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, FetchError> {
        let api_base =
            Url::parse(DATA_API_BASE).map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
        Self::with_base_urls(api_key, timeout, api_base, WEB_BASE.to_string())
    }

    pub fn with_base_urls(
        api_key: String,
        timeout: Duration,
        api_base: Url,
        web_base: String,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent("yt-mirrorbot/0.1")
            .build()?;
        Ok(Self {
            http,
            api_base,
            web_base,
            api_key,
            timeout,
        })
    }

    fn channels_url(&self, part: &str, channel_id: &str) -> Result<Url, FetchError> {
        let mut url = self
            .api_base
            .join("channels")
            .map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("part", part)
            .append_pair("id", channel_id)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    fn browser_get(&self, url: &str, timeout: Duration) -> RequestBuilder {
        self.http
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en")
            .header(reqwest::header::COOKIE, CONSENT_COOKIE)
            .timeout(timeout)
    }

    async fn send_text(request: RequestBuilder) -> Result<String, FetchError> {
        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }
        Ok(res.text().await?)
    }

    async fn channel_items<T: DeserializeOwned>(
        &self,
        part: &str,
        channel_id: &str,
    ) -> Result<T, FetchError> {
        let url = self.channels_url(part, channel_id)?;
        let body = Self::send_text(self.http.get(url).timeout(self.timeout)).await?;
        let list: ChannelList<T> = serde_json::from_str(&body)?;
        list.items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NoItems(channel_id.to_string()))
    }
}

#[async_trait]
impl YouTubeService for YouTubeClient {
    #[instrument(skip(self))]
    async fn channel_statistics(&self, channel_id: &str) -> Result<StatsSnapshot, FetchError> {
        let item: StatisticsItem = self.channel_items("statistics", channel_id).await?;
        let stats = item.statistics;
        Ok(StatsSnapshot {
            subscribers: parse_count(stats.subscriber_count.as_deref()),
            views: parse_count(stats.view_count.as_deref()),
            video_count: parse_count(stats.video_count.as_deref()),
        })
    }

    #[instrument(skip(self))]
    async fn channel_metadata(&self, channel_id: &str) -> Result<ChannelMeta, FetchError> {
        let item: MetadataItem = self
            .channel_items("snippet,brandingSettings", channel_id)
            .await?;
        let thumbs = item.snippet.thumbnails;
        let avatar_url = [thumbs.high, thumbs.medium, thumbs.default]
            .into_iter()
            .flatten()
            .find_map(|t| t.url.filter(|u| !u.is_empty()));
        let banner_url = item
            .branding_settings
            .image
            .banner_external_url
            .filter(|u| !u.is_empty())
            .map(|base| format!("{}=w2480", base));
        Ok(ChannelMeta {
            title: Some(
                item.snippet
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "YouTube Channel".to_string()),
            ),
            avatar_url,
            banner_url,
            channel_url: Some(channel_url(channel_id)),
        })
    }

    async fn fetch_feed(&self, channel_id: &str) -> Result<String, FetchError> {
        let url = feed_url(&self.web_base, channel_id);
        debug!(%url, "fetching upload feed");
        Self::send_text(self.http.get(url).timeout(self.timeout)).await
    }

    async fn fetch_live_page(&self, channel_id: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}/channel/{}/live",
            self.web_base.trim_end_matches('/'),
            channel_id
        );
        debug!(%url, "fetching live page");
        Self::send_text(self.browser_get(&url, LIVE_PAGE_TIMEOUT)).await
    }
}

#[async_trait]
impl PageFetcher for YouTubeClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        Self::send_text(self.browser_get(url, LIVE_PAGE_TIMEOUT)).await
    }
}
