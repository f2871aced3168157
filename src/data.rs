use std::sync::Arc;

use anyhow::{Context, Result};

use crate::youtube::{self, ChannelItem, SearchItem};

/// Remote metadata source the fetchers run against.
pub trait VideoService: Send + Sync {
    fn channel(&self, channel_id: &str, api_key: &str) -> Result<Option<ChannelItem>>;
    fn latest_videos(
        &self,
        channel_id: &str,
        api_key: &str,
        max_results: u32,
    ) -> Result<Vec<SearchItem>>;
}

pub struct YouTubeVideoService {
    client: Arc<youtube::Client>,
}

impl YouTubeVideoService {
    pub fn new(client: Arc<youtube::Client>) -> Self {
        Self { client }
    }
}

impl VideoService for YouTubeVideoService {
    fn channel(&self, channel_id: &str, api_key: &str) -> Result<Option<ChannelItem>> {
        self.client
            .channel(channel_id, api_key)
            .context("fetch channel metadata")
    }

    fn latest_videos(
        &self,
        channel_id: &str,
        api_key: &str,
        max_results: u32,
    ) -> Result<Vec<SearchItem>> {
        self.client
            .latest_videos(channel_id, api_key, max_results)
            .context("fetch latest videos")
    }
}
