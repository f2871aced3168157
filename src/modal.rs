use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::FeedError;
use crate::model::ChannelDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Identifies one detail fetch. Results are applied only while their
/// ticket is still the one the modal is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub channel_id: String,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismiss {
    CloseButton,
    EscapeKey,
    OverlayClick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalContent {
    Empty,
    Loading,
    Detail(ChannelDetail),
    Failed(String),
}

/// The embedded player. Bound to at most one video at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedPlayer {
    source: Option<String>,
    playing: bool,
    reloads: u32,
}

impl EmbeddedPlayer {
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Times the source was cleared and restored to stop playback.
    pub fn reloads(&self) -> u32 {
        self.reloads
    }

    fn load(&mut self, video_id: Option<&str>) {
        self.source = video_id.map(str::to_string);
        self.playing = self.source.is_some();
    }

    fn halt(&mut self) {
        let source = self.source.take();
        self.source = source;
        self.playing = false;
        self.reloads += 1;
    }
}

#[derive(Debug)]
pub struct ModalController {
    phase: ModalPhase,
    channel_id: Option<String>,
    content: ModalContent,
    player: EmbeddedPlayer,
    pending: Option<FetchTicket>,
    next_generation: u64,
    exit_delay: Duration,
    closing_deadline: Option<Instant>,
    stale_discards: u64,
}

impl ModalController {
    pub fn new(exit_delay: Duration) -> Self {
        Self {
            phase: ModalPhase::Closed,
            channel_id: None,
            content: ModalContent::Empty,
            player: EmbeddedPlayer::default(),
            pending: None,
            next_generation: 1,
            exit_delay,
            closing_deadline: None,
            stale_discards: 0,
        }
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    pub fn content(&self) -> &ModalContent {
        &self.content
    }

    pub fn player(&self) -> &EmbeddedPlayer {
        &self.player
    }

    /// Whether the overlay is laid out at all (true through the exit transition).
    pub fn is_displayed(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    /// Whether the overlay is in its visible (non-exiting) state.
    pub fn is_visible(&self) -> bool {
        matches!(self.phase, ModalPhase::Opening | ModalPhase::Open)
    }

    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.closing_deadline
    }

    /// Shows the loading body and returns the ticket the caller must attach
    /// to the detail fetch. Any earlier fetch becomes stale.
    pub fn open(&mut self, channel_id: &str) -> FetchTicket {
        let ticket = FetchTicket {
            channel_id: channel_id.to_string(),
            generation: self.next_generation,
        };
        self.next_generation = self.next_generation.wrapping_add(1);

        debug!(channel = %channel_id, from = ?self.phase, "opening channel modal");
        self.phase = ModalPhase::Opening;
        self.channel_id = Some(channel_id.to_string());
        self.content = ModalContent::Loading;
        self.closing_deadline = None;
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Applies a finished fetch. Returns false when the result was stale.
    pub fn resolve(
        &mut self,
        ticket: &FetchTicket,
        result: Result<ChannelDetail, FeedError>,
    ) -> bool {
        let current = self.pending.as_ref() == Some(ticket)
            && self.phase == ModalPhase::Opening
            && self.channel_id.as_deref() == Some(ticket.channel_id.as_str());
        if !current {
            self.stale_discards += 1;
            debug!(channel = %ticket.channel_id, "discarding stale channel result");
            return false;
        }

        self.pending = None;
        self.phase = ModalPhase::Open;
        match result {
            Ok(detail) => {
                self.player.load(detail.videos.primary_video_id());
                self.content = ModalContent::Detail(detail);
            }
            Err(err) => {
                self.player.load(None);
                self.content = ModalContent::Failed(err.to_string());
            }
        }
        true
    }

    /// Swaps the player's video without refetching the channel.
    pub fn select_video(&mut self, video_id: &str) -> Result<(), FeedError> {
        if self.phase != ModalPhase::Open {
            return Err(FeedError::UnexpectedRenderTarget("channel modal"));
        }
        if !matches!(self.content, ModalContent::Detail(_)) || self.player.source.is_none() {
            return Err(FeedError::UnexpectedRenderTarget("video player"));
        }
        self.player.load(Some(video_id));
        Ok(())
    }

    /// Starts the exit transition. Escape only counts while visible.
    pub fn dismiss(&mut self, reason: Dismiss, now: Instant) -> bool {
        if !self.is_visible() {
            return false;
        }
        debug!(?reason, "closing channel modal");
        self.phase = ModalPhase::Closing;
        self.pending = None;
        self.closing_deadline = Some(now + self.exit_delay);
        true
    }

    /// Finishes the exit transition once its window has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match (self.phase, self.closing_deadline) {
            (ModalPhase::Closing, Some(deadline)) if now >= deadline => {
                self.phase = ModalPhase::Closed;
                self.closing_deadline = None;
                self.player.halt();
                true
            }
            _ => false,
        }
    }
}
