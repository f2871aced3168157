use std::thread;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::data::VideoService;
use crate::error::FeedError;
use crate::model::{
    ChannelConfig, ChannelConfigEntry, ChannelDetail, ChannelSummary, DataOrigin, VideoList,
    VideoSummary,
};
use crate::render::placeholder_image_url;
use crate::youtube::{self, ChannelItem, SearchItem};

/// Channels fetched concurrently per group.
pub const BATCH_SIZE: usize = 3;

pub fn placeholder_summary(entry: &ChannelConfigEntry) -> ChannelSummary {
    let name = entry.display_name();
    ChannelSummary {
        id: entry.id.clone(),
        thumbnail_url: placeholder_image_url(&name),
        name,
        description: None,
        subscriber_count: None,
        video_count: None,
        origin: DataOrigin::Placeholder,
    }
}

fn live_summary(entry: &ChannelConfigEntry, item: ChannelItem) -> Option<ChannelSummary> {
    let thumbnail_url = item.snippet.thumbnails.medium?.url;
    let name = entry
        .name
        .clone()
        .or_else(|| Some(item.snippet.title.clone()).filter(|t| !t.trim().is_empty()))
        .unwrap_or_else(|| entry.display_name());
    Some(ChannelSummary {
        id: entry.id.clone(),
        name,
        description: Some(item.snippet.description).filter(|d| !d.is_empty()),
        thumbnail_url,
        subscriber_count: item.statistics.subscribers(),
        video_count: item.statistics.videos(),
        origin: DataOrigin::Live,
    })
}

/// Always yields a summary: live when the API answers with a usable match,
/// otherwise a placeholder.
pub fn fetch_channel_summary(
    service: &dyn VideoService,
    entry: &ChannelConfigEntry,
    api_key: &str,
) -> ChannelSummary {
    if api_key.is_empty() {
        debug!(channel = %entry.id, "no api key; using placeholder");
        return placeholder_summary(entry);
    }

    match service.channel(&entry.id, api_key) {
        Ok(Some(item)) => match live_summary(entry, item) {
            Some(summary) => summary,
            None => {
                warn!(channel = %entry.id, "channel response incomplete; using placeholder");
                placeholder_summary(entry)
            }
        },
        Ok(None) => {
            warn!(channel = %entry.id, "channel not found; using placeholder");
            placeholder_summary(entry)
        }
        Err(err) => {
            warn!(channel = %entry.id, error = %FeedError::remote(&err), "using placeholder");
            placeholder_summary(entry)
        }
    }
}

pub fn format_published(raw: &str, date_format: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => parsed.with_timezone(&Local).format(date_format).to_string(),
        Err(_) => raw.to_string(),
    }
}

fn video_summary(item: SearchItem, date_format: &str) -> Option<VideoSummary> {
    let id = item.id.video_id.filter(|id| !id.trim().is_empty())?;
    let thumbnail_url = item
        .snippet
        .thumbnails
        .medium
        .map(|thumb| thumb.url)
        .unwrap_or_else(|| youtube::video_thumbnail_url(&id));
    Some(VideoSummary {
        title: item.snippet.title,
        description: Some(item.snippet.description).filter(|d| !d.is_empty()),
        thumbnail_url,
        published_at: format_published(&item.snippet.published_at, date_format),
        id,
    })
}

/// Newest-first uploads. Empty both when the key is missing and when the
/// remote call fails; callers check the key beforehand to tell them apart.
pub fn fetch_latest_videos(
    service: &dyn VideoService,
    channel_id: &str,
    api_key: &str,
    max_results: u32,
    date_format: &str,
) -> Vec<VideoSummary> {
    if api_key.is_empty() {
        return Vec::new();
    }

    match service.latest_videos(channel_id, api_key, max_results.max(1)) {
        Ok(items) => items
            .into_iter()
            .filter_map(|item| video_summary(item, date_format))
            .collect(),
        Err(err) => {
            warn!(channel = %channel_id, error = %FeedError::remote(&err), "no latest videos");
            Vec::new()
        }
    }
}

/// Fetches summaries group by group. Requests inside a group run
/// concurrently; the next group starts only after the whole group settled.
/// `on_batch` sees every group in submission order.
pub fn fetch_summaries_batched<F>(
    service: &dyn VideoService,
    entries: &[ChannelConfigEntry],
    api_key: &str,
    batch_size: usize,
    mut on_batch: F,
) where
    F: FnMut(usize, Vec<ChannelSummary>),
{
    for (index, batch) in entries.chunks(batch_size.max(1)).enumerate() {
        let summaries = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|entry| scope.spawn(move || fetch_channel_summary(service, entry, api_key)))
                .collect();
            handles
                .into_iter()
                .zip(batch)
                .map(|(handle, entry)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!(channel = %entry.id, "channel fetch panicked; using placeholder");
                        placeholder_summary(entry)
                    })
                })
                .collect::<Vec<_>>()
        });
        debug!(batch = index, channels = summaries.len(), "channel batch settled");
        on_batch(index, summaries);
    }
}

pub fn fetch_all_summaries(
    service: &dyn VideoService,
    entries: &[ChannelConfigEntry],
    api_key: &str,
    batch_size: usize,
) -> Vec<ChannelSummary> {
    let mut all = Vec::with_capacity(entries.len());
    fetch_summaries_batched(service, entries, api_key, batch_size, |_, batch| {
        all.extend(batch)
    });
    all
}

/// Fresh summary plus video list for the detail view. When the fresh lookup
/// degrades to a placeholder, live fields already loaded for the list are
/// reused before falling back further.
pub fn fetch_channel_detail(
    service: &dyn VideoService,
    config: &ChannelConfig,
    channel_id: &str,
    cached: Option<&ChannelSummary>,
    api_key: &str,
    date_format: &str,
) -> Result<ChannelDetail, FeedError> {
    let entry = config
        .find(channel_id)
        .ok_or_else(|| FeedError::UnknownChannel(channel_id.to_string()))?;

    let mut summary = fetch_channel_summary(service, entry, api_key);
    if summary.is_placeholder() && !api_key.is_empty() {
        if let Some(cached) = cached.filter(|c| c.id == channel_id && !c.is_placeholder()) {
            debug!(channel = %channel_id, "continuing with list data");
            summary = cached.clone();
        }
    }
    let live = fetch_latest_videos(service, channel_id, api_key, config.max_results, date_format);
    let videos = VideoList::choose(live, &config.fallback_videos, !api_key.is_empty());

    Ok(ChannelDetail { summary, videos })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::VideoConfigEntry;
    use anyhow::{anyhow, Result};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Start(String),
        End(String),
    }

    /// Scripted service: ids in `failing` error out, ids in `missing` have
    /// no match, everything else answers with a full record.
    #[derive(Default)]
    pub(crate) struct ScriptedService {
        pub failing: HashSet<String>,
        pub missing: HashSet<String>,
        pub delay: Duration,
        pub calls: Mutex<Vec<Call>>,
    }

    pub(crate) fn channel_item(id: &str) -> ChannelItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "snippet": {
                "title": format!("Remote {id}"),
                "description": format!("About {id}"),
                "thumbnails": {"medium": {"url": format!("https://img.test/{id}.jpg")}}
            },
            "statistics": {"subscriberCount": "12345", "videoCount": "67"}
        }))
        .unwrap()
    }

    pub(crate) fn search_item(id: &str, published: &str) -> SearchItem {
        serde_json::from_value(serde_json::json!({
            "id": {"videoId": id},
            "snippet": {"title": format!("Video {id}"), "publishedAt": published}
        }))
        .unwrap()
    }

    impl VideoService for ScriptedService {
        fn channel(&self, channel_id: &str, _api_key: &str) -> Result<Option<ChannelItem>> {
            self.calls.lock().push(Call::Start(channel_id.to_string()));
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.calls.lock().push(Call::End(channel_id.to_string()));
            if self.failing.contains(channel_id) {
                return Err(anyhow!("connection reset"));
            }
            if self.missing.contains(channel_id) {
                return Ok(None);
            }
            Ok(Some(channel_item(channel_id)))
        }

        fn latest_videos(
            &self,
            channel_id: &str,
            _api_key: &str,
            max_results: u32,
        ) -> Result<Vec<SearchItem>> {
            if self.failing.contains(channel_id) {
                return Err(anyhow!("quota exceeded"));
            }
            Ok((0..max_results.min(2))
                .map(|n| search_item(&format!("{channel_id}-v{n}"), "2024-03-05T12:00:00Z"))
                .collect())
        }
    }

    fn entries(count: usize) -> Vec<ChannelConfigEntry> {
        (0..count)
            .map(|n| ChannelConfigEntry::new(format!("UC{n:04}"), None))
            .collect()
    }

    #[test]
    fn empty_key_always_yields_placeholders_without_calls() {
        let service = ScriptedService::default();
        for count in 0..=10 {
            let summaries = fetch_all_summaries(&service, &entries(count), "", BATCH_SIZE);
            assert_eq!(summaries.len(), count);
            for summary in &summaries {
                assert!(summary.is_placeholder());
                assert_eq!(summary.subscriber_count, None);
                assert_eq!(summary.video_count, None);
                assert!(summary.thumbnail_url.starts_with("https://placehold.co/"));
            }
        }
        assert!(service.calls.lock().is_empty());
    }

    #[test]
    fn every_entry_resolves_regardless_of_outcome() {
        let list = entries(10);
        let service = ScriptedService {
            failing: list.iter().step_by(3).map(|e| e.id.clone()).collect(),
            missing: list.iter().skip(1).step_by(4).map(|e| e.id.clone()).collect(),
            ..ScriptedService::default()
        };
        let summaries = fetch_all_summaries(&service, &list, "key", BATCH_SIZE);
        assert_eq!(summaries.len(), 10);
        for (summary, entry) in summaries.iter().zip(&list) {
            assert_eq!(summary.id, entry.id);
            let expect_placeholder =
                service.failing.contains(&entry.id) || service.missing.contains(&entry.id);
            assert_eq!(summary.is_placeholder(), expect_placeholder);
        }
    }

    #[test]
    fn live_summary_is_complete_and_keeps_configured_name() {
        let service = ScriptedService::default();
        let entry = ChannelConfigEntry::new("UC1", Some("Configured"));
        let summary = fetch_channel_summary(&service, &entry, "key");
        assert_eq!(summary.origin, DataOrigin::Live);
        assert_eq!(summary.name, "Configured");
        assert_eq!(summary.description.as_deref(), Some("About UC1"));
        assert_eq!(summary.thumbnail_url, "https://img.test/UC1.jpg");
        assert_eq!(summary.subscriber_count, Some(12345));
        assert_eq!(summary.video_count, Some(67));

        let entry = ChannelConfigEntry::new("UC2", None);
        assert_eq!(fetch_channel_summary(&service, &entry, "key").name, "Remote UC2");
    }

    #[test]
    fn response_without_thumbnail_degrades_whole_summary() {
        struct Bare;
        impl VideoService for Bare {
            fn channel(&self, _: &str, _: &str) -> Result<Option<ChannelItem>> {
                Ok(Some(
                    serde_json::from_value(serde_json::json!({
                        "snippet": {"title": "T", "description": "D"},
                        "statistics": {"subscriberCount": "5"}
                    }))
                    .unwrap(),
                ))
            }
            fn latest_videos(&self, _: &str, _: &str, _: u32) -> Result<Vec<SearchItem>> {
                Ok(Vec::new())
            }
        }
        let summary = fetch_channel_summary(&Bare, &ChannelConfigEntry::new("UC1", None), "k");
        assert!(summary.is_placeholder());
        assert_eq!(summary.description, None);
        assert_eq!(summary.subscriber_count, None);
    }

    #[test]
    fn seven_channels_form_three_sequential_groups() {
        let list = entries(7);
        let service = ScriptedService {
            delay: Duration::from_millis(20),
            ..ScriptedService::default()
        };
        let mut sizes = Vec::new();
        let mut indexes = Vec::new();
        fetch_summaries_batched(&service, &list, "key", BATCH_SIZE, |index, batch| {
            indexes.push(index);
            sizes.push(batch.len());
        });
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(indexes, vec![0, 1, 2]);

        let calls = service.calls.lock().clone();
        let position = |call: Call| calls.iter().position(|c| *c == call).unwrap();
        for (group, next) in [(0..3, 3..6), (3..6, 6..7)] {
            let last_end = group
                .map(|n| position(Call::End(list[n].id.clone())))
                .max()
                .unwrap();
            let first_start = next
                .map(|n| position(Call::Start(list[n].id.clone())))
                .min()
                .unwrap();
            assert!(last_end < first_start, "calls: {calls:?}");
        }
    }

    #[test]
    fn requests_within_a_group_overlap() {
        let list = entries(3);
        let service = ScriptedService {
            delay: Duration::from_millis(50),
            ..ScriptedService::default()
        };
        fetch_all_summaries(&service, &list, "key", BATCH_SIZE);
        let calls = service.calls.lock().clone();
        let starts_before_first_end = calls
            .iter()
            .take_while(|c| matches!(c, Call::Start(_)))
            .count();
        assert_eq!(starts_before_first_end, 3, "calls: {calls:?}");
    }

    #[test]
    fn latest_videos_need_a_key_and_swallow_failures() {
        let service = ScriptedService {
            failing: ["UCbad".to_string()].into_iter().collect(),
            ..ScriptedService::default()
        };
        assert!(fetch_latest_videos(&service, "UC1", "", 5, "%Y").is_empty());
        assert!(fetch_latest_videos(&service, "UCbad", "k", 5, "%Y").is_empty());
        let videos = fetch_latest_videos(&service, "UC1", "k", 5, "%Y-%m-%d");
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, "UC1-v0");
        assert_eq!(videos[0].published_at, "2024-03-05");
        assert_eq!(videos[0].thumbnail_url, youtube::video_thumbnail_url("UC1-v0"));
    }

    #[test]
    fn unparseable_publish_dates_are_kept_verbatim() {
        assert_eq!(format_published("yesterday", "%Y"), "yesterday");
    }

    #[test]
    fn detail_uses_fallback_videos_without_key() {
        let config = ChannelConfig {
            channels: vec![ChannelConfigEntry::new("UC1", Some("One"))],
            max_results: 5,
            fallback_videos: vec![VideoConfigEntry {
                id: "f1".into(),
                title: "Sample".into(),
            }],
        };
        let service = ScriptedService::default();
        let detail = fetch_channel_detail(&service, &config, "UC1", None, "", "%Y").unwrap();
        assert!(detail.summary.is_placeholder());
        assert_eq!(detail.videos.primary_video_id(), Some("f1"));

        let detail = fetch_channel_detail(&service, &config, "UC1", None, "k", "%Y").unwrap();
        assert!(matches!(detail.videos, VideoList::Live(_)));

        let err = fetch_channel_detail(&service, &config, "UCother", None, "k", "%Y").unwrap_err();
        assert_eq!(err, FeedError::UnknownChannel("UCother".into()));
    }

    #[test]
    fn failed_detail_lookup_keeps_list_fields() {
        let config = ChannelConfig {
            channels: vec![ChannelConfigEntry::new("UC1", Some("One"))],
            max_results: 5,
            fallback_videos: Vec::new(),
        };
        let listed = fetch_channel_summary(&ScriptedService::default(), &config.channels[0], "k");
        assert!(!listed.is_placeholder());

        let flaky = ScriptedService {
            failing: HashSet::from(["UC1".to_string()]),
            ..ScriptedService::default()
        };
        let detail =
            fetch_channel_detail(&flaky, &config, "UC1", Some(&listed), "k", "%Y").unwrap();
        assert_eq!(detail.summary, listed);
        assert_eq!(detail.summary.subscriber_count, Some(12345));

        let detail = fetch_channel_detail(&flaky, &config, "UC1", None, "k", "%Y").unwrap();
        assert!(detail.summary.is_placeholder());

        // Without a key the placeholder tier applies even with list data around.
        let detail =
            fetch_channel_detail(&flaky, &config, "UC1", Some(&listed), "", "%Y").unwrap();
        assert!(detail.summary.is_placeholder());
    }
}
