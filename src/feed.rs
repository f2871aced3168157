use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info};

use crate::config::Config;
use crate::data::VideoService;
use crate::error::FeedError;
use crate::fetch;
use crate::modal::{Dismiss, FetchTicket, ModalController};
use crate::model::{ChannelConfig, ChannelDetail, ChannelSummary};
use crate::render;
use crate::resolver::Resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    pub section: String,
    pub date_format: String,
    pub show_delay: Duration,
    pub animation: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FeedOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            section: cfg.site.section.clone(),
            date_format: cfg.ui.date_format.clone(),
            show_delay: cfg.ui.show_delay,
            animation: cfg.ui.animation,
        }
    }
}

/// Notifications from the surrounding page about which section is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionEvent {
    Selected(String),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Hidden,
    Visible,
}

/// Entrance/exit of the channel list container.
#[derive(Debug)]
pub struct ListVisibility {
    visible: bool,
    displayed: bool,
    show_at: Option<Instant>,
    hide_at: Option<Instant>,
    show_delay: Duration,
    exit_delay: Duration,
}

impl ListVisibility {
    pub fn new(show_delay: Duration, exit_delay: Duration) -> Self {
        Self {
            visible: false,
            displayed: false,
            show_at: None,
            hide_at: None,
            show_delay,
            exit_delay,
        }
    }

    pub fn state(&self) -> ListState {
        if self.visible {
            ListState::Visible
        } else {
            ListState::Hidden
        }
    }

    /// True while laid out, including the exit transition.
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    pub fn show(&mut self) {
        self.show_at = None;
        self.hide_at = None;
        self.visible = true;
        self.displayed = true;
    }

    pub fn hide(&mut self, now: Instant) {
        self.show_at = None;
        if !self.displayed {
            return;
        }
        self.visible = false;
        self.hide_at = Some(now + self.exit_delay);
    }

    pub fn notify(&mut self, event: &SectionEvent, section: &str, now: Instant) {
        match event {
            SectionEvent::Selected(name) if name == section => {
                self.show_at = Some(now + self.show_delay);
            }
            SectionEvent::Selected(_) | SectionEvent::Closed => {
                if self.visible || self.show_at.is_some() {
                    self.hide(now);
                }
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(at) = self.show_at {
            if now >= at {
                self.show();
                changed = true;
            }
        }
        if let Some(at) = self.hide_at {
            if now >= at {
                self.hide_at = None;
                if !self.visible {
                    self.displayed = false;
                    changed = true;
                }
            }
        }
        changed
    }
}

enum FeedUpdate {
    Batch {
        generation: u64,
        index: usize,
        summaries: Vec<ChannelSummary>,
    },
    ListDone {
        generation: u64,
    },
    Detail {
        ticket: FetchTicket,
        result: Result<ChannelDetail, FeedError>,
    },
}

/// Owned widget state. Built once at mount and driven from a single thread;
/// background fetches report back through `poll`.
pub struct Feed {
    service: Arc<dyn VideoService>,
    api_key: String,
    channels: Arc<ChannelConfig>,
    options: FeedOptions,
    list: ListVisibility,
    modal: ModalController,
    summaries: Vec<ChannelSummary>,
    list_generation: u64,
    list_loading: bool,
    tx: Sender<FeedUpdate>,
    rx: Receiver<FeedUpdate>,
}

impl Feed {
    pub fn new(
        service: Arc<dyn VideoService>,
        api_key: String,
        channels: ChannelConfig,
        options: FeedOptions,
    ) -> Self {
        let (tx, rx) = unbounded();
        Self {
            service,
            api_key,
            channels: Arc::new(channels),
            list: ListVisibility::new(options.show_delay, options.animation),
            modal: ModalController::new(options.animation),
            options,
            summaries: Vec::new(),
            list_generation: 0,
            list_loading: false,
            tx,
            rx,
        }
    }

    /// Resolves key and channels, then starts loading the list.
    pub fn mount(
        service: Arc<dyn VideoService>,
        resolver: &Resolver,
        options: FeedOptions,
    ) -> Self {
        let api_key = resolver.resolve_api_key();
        let channels = resolver.resolve_channel_config();
        let mut feed = Self::new(service, api_key, channels, options);
        feed.load_channels();
        feed
    }

    pub fn api_key_present(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn channels(&self) -> &ChannelConfig {
        &self.channels
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    pub fn summaries(&self) -> &[ChannelSummary] {
        &self.summaries
    }

    pub fn is_list_loading(&self) -> bool {
        self.list_loading
    }

    pub fn list(&self) -> &ListVisibility {
        &self.list
    }

    pub fn modal(&self) -> &ModalController {
        &self.modal
    }

    /// Restarts the batched list load in the background.
    pub fn load_channels(&mut self) {
        self.list_generation = self.list_generation.wrapping_add(1);
        self.summaries.clear();
        self.list_loading = true;

        let generation = self.list_generation;
        let service = self.service.clone();
        let channels = self.channels.clone();
        let api_key = self.api_key.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            fetch::fetch_summaries_batched(
                service.as_ref(),
                &channels.channels,
                &api_key,
                fetch::BATCH_SIZE,
                |index, summaries| {
                    let _ = tx.send(FeedUpdate::Batch {
                        generation,
                        index,
                        summaries,
                    });
                },
            );
            let _ = tx.send(FeedUpdate::ListDone { generation });
        });
    }

    /// Loads the whole list on the calling thread.
    pub fn load_channels_blocking(&mut self) -> &[ChannelSummary] {
        self.list_generation = self.list_generation.wrapping_add(1);
        self.summaries = fetch::fetch_all_summaries(
            self.service.as_ref(),
            &self.channels.channels,
            &self.api_key,
            fetch::BATCH_SIZE,
        );
        self.list_loading = false;
        &self.summaries
    }

    pub fn show(&mut self) {
        self.list.show();
    }

    pub fn hide(&mut self, now: Instant) {
        self.list.hide(now);
    }

    pub fn notify(&mut self, event: SectionEvent, now: Instant) {
        debug!(?event, "section notification");
        self.list.notify(&event, &self.options.section, now);
    }

    /// Live summary loaded by the list for this channel, if any.
    fn listed_summary(&self, channel_id: &str) -> Option<&ChannelSummary> {
        self.summaries
            .iter()
            .find(|summary| summary.id == channel_id && !summary.is_placeholder())
    }

    /// Opens the modal for a channel and starts a fresh detail fetch.
    /// Earlier fetches keep running; their results are discarded.
    pub fn open_channel(&mut self, channel_id: &str) -> FetchTicket {
        let ticket = self.modal.open(channel_id);

        let service = self.service.clone();
        let channels = self.channels.clone();
        let api_key = self.api_key.clone();
        let date_format = self.options.date_format.clone();
        let tx = self.tx.clone();
        let request = ticket.clone();
        let cached = self.listed_summary(channel_id).cloned();
        thread::spawn(move || {
            let result = fetch::fetch_channel_detail(
                service.as_ref(),
                &channels,
                &request.channel_id,
                cached.as_ref(),
                &api_key,
                &date_format,
            );
            let _ = tx.send(FeedUpdate::Detail {
                ticket: request,
                result,
            });
        });

        ticket
    }

    /// Fetches a channel detail on the calling thread and applies it.
    pub fn open_channel_blocking(&mut self, channel_id: &str) -> &ModalController {
        let ticket = self.modal.open(channel_id);
        let result = fetch::fetch_channel_detail(
            self.service.as_ref(),
            &self.channels,
            channel_id,
            self.listed_summary(channel_id),
            &self.api_key,
            &self.options.date_format,
        );
        self.modal.resolve(&ticket, result);
        &self.modal
    }

    pub fn close(&mut self, reason: Dismiss, now: Instant) -> bool {
        self.modal.dismiss(reason, now)
    }

    pub fn select_video(&mut self, video_id: &str) -> bool {
        match self.modal.select_video(video_id) {
            Ok(()) => true,
            Err(err) => {
                debug!(video = %video_id, error = %err, "video selection ignored");
                false
            }
        }
    }

    /// Applies finished background work and elapsed transitions.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(update) = self.rx.try_recv() {
            changed |= self.apply(update);
        }
        changed |= self.list.tick(now);
        changed |= self.modal.tick(now);
        changed
    }

    fn apply(&mut self, update: FeedUpdate) -> bool {
        match update {
            FeedUpdate::Batch {
                generation,
                index,
                summaries,
            } => {
                if generation != self.list_generation {
                    return false;
                }
                debug!(batch = index, channels = summaries.len(), "appending channel batch");
                self.summaries.extend(summaries);
                true
            }
            FeedUpdate::ListDone { generation } => {
                if generation != self.list_generation {
                    return false;
                }
                self.list_loading = false;
                info!(channels = self.summaries.len(), "channel list loaded");
                true
            }
            FeedUpdate::Detail { ticket, result } => self.modal.resolve(&ticket, result),
        }
    }

    pub fn render_list(&self) -> String {
        if self.list_loading && self.summaries.is_empty() {
            return render::render_loading("Loading channels...");
        }
        render::render_channel_list(&self.summaries, self.api_key_present())
    }

    pub fn render_modal(&self) -> String {
        render::render_modal_body(&self.modal)
    }
}
