use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::FeedError;
use crate::model::{ChannelConfig, ChannelConfigEntry, VideoConfigEntry, DOCUMENT_MAX_RESULTS};

const LEGACY_CHANNEL_NAME: &str = "Comic Book Channel";

/// Where configuration documents are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Site {
    Directory(PathBuf),
    Remote(Url),
}

impl Site {
    pub fn parse(root: &str) -> Result<Self> {
        let trimmed = root.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let mut url =
                Url::parse(trimmed).with_context(|| format!("parse site root {trimmed:?}"))?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            Ok(Site::Remote(url))
        } else if trimmed.is_empty() {
            Ok(Site::Directory(PathBuf::from(".")))
        } else {
            Ok(Site::Directory(PathBuf::from(trimmed)))
        }
    }

    pub fn locate(&self, path: &str) -> Result<Location> {
        match self {
            Site::Remote(base) => base
                .join(path)
                .map(Location::Remote)
                .with_context(|| format!("join {path:?} onto {base}")),
            Site::Directory(root) => Ok(Location::File(root.join(path.trim_start_matches('/')))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Remote(Url),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Reads JSON documents from disk or over HTTP.
pub struct DocumentLoader {
    http: HttpClient,
    user_agent: String,
}

impl DocumentLoader {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("resolver: build http client")?;
        Ok(Self {
            http,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn load(&self, location: &Location) -> Result<Value> {
        match location {
            Location::File(path) => {
                let data = fs::read_to_string(path)
                    .with_context(|| format!("read {}", path.display()))?;
                serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))
            }
            Location::Remote(url) => {
                let response = self
                    .http
                    .get(url.clone())
                    .header(USER_AGENT, &self.user_agent)
                    .send()
                    .with_context(|| format!("request {url}"))?;
                if !response.status().is_success() {
                    bail!("request {url} failed: {}", response.status());
                }
                response.json().with_context(|| format!("parse {url}"))
            }
        }
    }
}

/// One place an API key may come from, tried in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Configured(String),
    Sibling { integration: String, key: String },
    Endpoint(Location),
}

impl KeySource {
    fn describe(&self) -> String {
        match self {
            KeySource::Configured(_) => "configured value".to_string(),
            KeySource::Sibling { integration, .. } => format!("{integration} integration"),
            KeySource::Endpoint(location) => format!("key endpoint {location}"),
        }
    }

    fn lookup(&self, loader: &DocumentLoader) -> Result<Option<String>> {
        match self {
            KeySource::Configured(key) | KeySource::Sibling { key, .. } => {
                Ok(Some(key.trim().to_string()).filter(|k| !k.is_empty()))
            }
            KeySource::Endpoint(location) => {
                let document = loader.load(location)?;
                Ok(key_from_document(&document))
            }
        }
    }
}

fn key_from_document(document: &Value) -> Option<String> {
    document
        .pointer("/externalApis/youtube/apiKey")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

pub struct Resolver {
    loader: DocumentLoader,
    key_sources: Vec<KeySource>,
    candidates: Vec<Location>,
    section: String,
}

impl Resolver {
    pub fn new(
        loader: DocumentLoader,
        key_sources: Vec<KeySource>,
        candidates: Vec<Location>,
        section: impl Into<String>,
    ) -> Self {
        let mut unique: Vec<Location> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        Self {
            loader,
            key_sources,
            candidates: unique,
            section: section.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let site = Site::parse(&cfg.site.root)?;
        let loader = DocumentLoader::new(&cfg.youtube.user_agent, cfg.youtube.timeout)?;
        let key_sources = vec![
            KeySource::Configured(cfg.youtube.api_key.clone()),
            KeySource::Sibling {
                integration: "tmdb".into(),
                key: cfg.integrations.tmdb.youtube_api_key.clone(),
            },
            KeySource::Endpoint(site.locate(&cfg.site.api_config_path)?),
        ];
        let candidates = cfg
            .site
            .channel_config_paths
            .iter()
            .map(|path| site.locate(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(loader, key_sources, candidates, cfg.site.section.clone()))
    }

    pub fn candidates(&self) -> &[Location] {
        &self.candidates
    }

    /// First non-empty key from the ordered sources. Empty means placeholder mode.
    pub fn resolve_api_key(&self) -> String {
        for source in &self.key_sources {
            match source.lookup(&self.loader) {
                Ok(Some(key)) => {
                    info!(source = %source.describe(), "using youtube api key");
                    return key;
                }
                Ok(None) => debug!(source = %source.describe(), "no youtube api key"),
                Err(err) => {
                    warn!(
                        source = %source.describe(),
                        error = %format!("{err:#}"),
                        "failed to load youtube api key"
                    )
                }
            }
        }
        warn!("{}; using placeholder data", FeedError::KeyUnavailable);
        String::new()
    }

    /// First candidate holding a usable channel section, else the built-in pair.
    pub fn resolve_channel_config(&self) -> ChannelConfig {
        for location in &self.candidates {
            debug!(%location, "trying channel configuration");
            let document = match self.loader.load(location) {
                Ok(document) => document,
                Err(err) => {
                    debug!(
                        %location,
                        error = %format!("{err:#}"),
                        "channel configuration unavailable"
                    );
                    continue;
                }
            };
            match parse_channel_document(&document, &self.section) {
                Some(config) => {
                    info!(
                        %location,
                        channels = config.channels.len(),
                        "loaded channel configuration"
                    );
                    return config;
                }
                None => warn!(
                    %location,
                    section = %self.section,
                    "channel configuration has no usable section"
                ),
            }
        }

        warn!(
            "{}; using default channels",
            FeedError::ConfigUnavailable {
                tried: self.candidates.len()
            }
        );
        ChannelConfig::builtin()
    }
}

/// Reads the named section. An explicit `channels` array wins over the
/// legacy `channelId`/`channelName` pair.
pub fn parse_channel_document(document: &Value, section: &str) -> Option<ChannelConfig> {
    let section = document.get(section)?.as_object()?;

    let mut channels = match section.get("channels").and_then(Value::as_array) {
        Some(list) => {
            serde_json::from_value::<Vec<ChannelConfigEntry>>(Value::Array(list.clone())).ok()?
        }
        None => {
            let id = section
                .get("channelId")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())?;
            let name = section
                .get("channelName")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(LEGACY_CHANNEL_NAME);
            vec![ChannelConfigEntry::new(id, Some(name))]
        }
    };

    if channels.is_empty() {
        warn!("channel list is empty; using default channels");
        channels = ChannelConfig::builtin_channels();
    }

    let max_results = section
        .get("maxResults")
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .map(|n| n.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(DOCUMENT_MAX_RESULTS);

    let fallback_videos = match section.get("fallbackVideos") {
        Some(value) => serde_json::from_value::<Vec<VideoConfigEntry>>(value.clone())
            .unwrap_or_else(|err| {
                warn!(error = %err, "ignoring malformed fallback videos");
                Vec::new()
            }),
        None => Vec::new(),
    };

    Some(ChannelConfig {
        channels,
        max_results,
        fallback_videos,
    })
}
