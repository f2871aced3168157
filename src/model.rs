use serde::{Deserialize, Deserializer, Serialize};

/// Result cap used when no channel document could be loaded.
pub const DEFAULT_MAX_RESULTS: u32 = 5;
/// Result cap used when a loaded document omits `maxResults`.
pub const DOCUMENT_MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfigEntry {
    pub id: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
}

impl ChannelConfigEntry {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string).filter(|n| !n.trim().is_empty()),
        }
    }

    /// Configured name, or a short label derived from the id.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Channel {}", self.id.chars().take(6).collect::<String>()),
        }
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConfigEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channels: Vec<ChannelConfigEntry>,
    pub max_results: u32,
    pub fallback_videos: Vec<VideoConfigEntry>,
}

impl ChannelConfig {
    pub fn builtin_channels() -> Vec<ChannelConfigEntry> {
        vec![
            ChannelConfigEntry::new("UCLE0YuDRMprbHMfbvJYZpMw", Some("Raph Retro Comics")),
            ChannelConfigEntry::new("UCDOkxRiVpdv6bYqrSa4TZlA", Some("Dope Comix")),
        ]
    }

    pub fn builtin() -> Self {
        Self {
            channels: Self::builtin_channels(),
            max_results: DEFAULT_MAX_RESULTS,
            fallback_videos: Vec::new(),
        }
    }

    pub fn find(&self, channel_id: &str) -> Option<&ChannelConfigEntry> {
        self.channels.iter().find(|entry| entry.id == channel_id)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Live,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub subscriber_count: Option<u64>,
    pub video_count: Option<u64>,
    pub origin: DataOrigin,
}

impl ChannelSummary {
    pub fn is_placeholder(&self) -> bool {
        self.origin == DataOrigin::Placeholder
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub published_at: String,
}

/// Videos shown in the detail view, tagged with where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoList {
    Live(Vec<VideoSummary>),
    Fallback(Vec<VideoConfigEntry>),
    Empty { api_key_present: bool },
}

impl VideoList {
    pub fn choose(
        live: Vec<VideoSummary>,
        fallback: &[VideoConfigEntry],
        api_key_present: bool,
    ) -> Self {
        if !live.is_empty() {
            VideoList::Live(live)
        } else if !fallback.is_empty() {
            VideoList::Fallback(fallback.to_vec())
        } else {
            VideoList::Empty { api_key_present }
        }
    }

    pub fn primary_video_id(&self) -> Option<&str> {
        match self {
            VideoList::Live(videos) => videos.first().map(|v| v.id.as_str()),
            VideoList::Fallback(videos) => videos.first().map(|v| v.id.as_str()),
            VideoList::Empty { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VideoList::Live(videos) => videos.len(),
            VideoList::Fallback(videos) => videos.len(),
            VideoList::Empty { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(id, title)` of the entry at `index`.
    pub fn get(&self, index: usize) -> Option<(&str, &str)> {
        match self {
            VideoList::Live(videos) => videos
                .get(index)
                .map(|v| (v.id.as_str(), v.title.as_str())),
            VideoList::Fallback(videos) => videos
                .get(index)
                .map(|v| (v.id.as_str(), v.title.as_str())),
            VideoList::Empty { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetail {
    pub summary: ChannelSummary,
    pub videos: VideoList,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> VideoSummary {
        VideoSummary {
            id: id.into(),
            title: format!("Video {id}"),
            description: None,
            thumbnail_url: String::new(),
            published_at: "1/1/2024".into(),
        }
    }

    #[test]
    fn display_name_prefers_configured_name() {
        let entry = ChannelConfigEntry::new("UCabcdefgh", Some("Named"));
        assert_eq!(entry.display_name(), "Named");
        let entry = ChannelConfigEntry::new("UCabcdefgh", None);
        assert_eq!(entry.display_name(), "Channel UCabcd");
        let entry = ChannelConfigEntry::new("UC1", Some("  "));
        assert_eq!(entry.display_name(), "Channel UC1");
    }

    #[test]
    fn blank_names_deserialize_as_absent() {
        let entry: ChannelConfigEntry =
            serde_json::from_str(r#"{"id":"X","name":""}"#).unwrap();
        assert_eq!(entry.name, None);
    }

    #[test]
    fn live_videos_win_over_fallback() {
        let fallback = vec![VideoConfigEntry {
            id: "f1".into(),
            title: "Fallback".into(),
        }];
        let list = VideoList::choose(vec![video("a"), video("b")], &fallback, true);
        assert_eq!(list.primary_video_id(), Some("a"));

        let list = VideoList::choose(Vec::new(), &fallback, true);
        assert_eq!(list.primary_video_id(), Some("f1"));

        let list = VideoList::choose(Vec::new(), &[], false);
        assert_eq!(
            list,
            VideoList::Empty {
                api_key_present: false
            }
        );
        assert_eq!(list.primary_video_id(), None);
    }
}
