use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const EMBED_URL_BASE: &str = "https://www.youtube.com/embed";
pub const CHANNEL_URL_BASE: &str = "https://www.youtube.com/channel";
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch";
pub const THUMBNAIL_URL_BASE: &str = "https://img.youtube.com/vi";

pub fn embed_url(video_id: &str) -> String {
    format!("{EMBED_URL_BASE}/{video_id}")
}

pub fn channel_url(channel_id: &str) -> String {
    format!("{CHANNEL_URL_BASE}/{channel_id}")
}

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL_BASE}?v={video_id}")
}

pub fn video_thumbnail_url(video_id: &str) -> String {
    format!("{THUMBNAIL_URL_BASE}/{video_id}/mqdefault.jpg")
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("channel-feed/{}", crate::VERSION),
            base_url: None,
            timeout: Duration::from_secs(20),
            http_client: None,
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("youtube client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("youtube: build http client")?,
        };

        let base_url = config
            .base_url
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| YOUTUBE_API_BASE.to_string());

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Metadata for one channel; `None` when the API has no match.
    pub fn channel(&self, channel_id: &str, api_key: &str) -> Result<Option<ChannelItem>> {
        let response: ListResponse<ChannelItem> = self.get(
            "channels",
            &[
                ("part", "snippet,statistics"),
                ("id", channel_id),
                ("key", api_key),
            ],
        )?;
        Ok(response.items.into_iter().next())
    }

    /// Most recent uploads of a channel, newest first.
    pub fn latest_videos(
        &self,
        channel_id: &str,
        api_key: &str,
        max_results: u32,
    ) -> Result<Vec<SearchItem>> {
        let max_results = max_results.to_string();
        let response: ListResponse<SearchItem> = self.get(
            "search",
            &[
                ("part", "snippet"),
                ("channelId", channel_id),
                ("maxResults", max_results.as_str()),
                ("order", "date"),
                ("type", "video"),
                ("key", api_key),
            ],
        )?;
        Ok(response.items)
    }

    fn get<T: DeserializeOwned>(&self, resource: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = Url::parse_with_params(&format!("{}/{}", self.base_url, resource), params)
            .with_context(|| format!("youtube: build {resource} url"))?;
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .with_context(|| format!("youtube: request {resource}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("youtube: {resource} request failed: {status}");
        }

        response
            .json()
            .with_context(|| format!("youtube: decode {resource} response"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelItem {
    #[serde(default)]
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Counts arrive as decimal strings; numbers are tolerated too.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub subscriber_count: Option<Value>,
    #[serde(default)]
    pub video_count: Option<Value>,
}

impl Statistics {
    pub fn subscribers(&self) -> Option<u64> {
        parse_count(self.subscriber_count.as_ref())
    }

    pub fn videos(&self) -> Option<u64> {
        parse_count(self.video_count.as_ref())
    }
}

fn parse_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub id: SearchId,
    pub snippet: SearchSnippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(default)]
    pub published_at: String,
}
