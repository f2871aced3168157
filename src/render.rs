//! HTML markup for the channel list and the channel modal.

use std::fmt::{self, Display, Formatter, Write as _};

use html_escaper::HtmlEscaper;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::modal::{ModalContent, ModalController};
use crate::model::{ChannelDetail, ChannelSummary, VideoList};
use crate::youtube;

pub const DESCRIPTION_LIMIT: usize = 200;
const ELLIPSIS: &str = "...";
const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/100x100/333/666";

// Characters encodeURIComponent leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// Also encodes the apostrophe, which would end a quoted script string.
const SCRIPT_STRING: &AsciiSet = &URI_COMPONENT.add(b'\'');

struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(HtmlEscaper(f), "{}", self.0)
    }
}

fn esc(text: &str) -> String {
    Escaped(text).to_string()
}

pub fn placeholder_image_url(name: &str) -> String {
    format!(
        "{PLACEHOLDER_IMAGE_BASE}?text={}",
        utf8_percent_encode(name, URI_COMPONENT)
    )
}

pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let mut out: String = text.chars().take(DESCRIPTION_LIMIT).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Thousands-grouped count, or "N/A" when unknown.
pub fn format_count(count: Option<u64>) -> String {
    let Some(count) = count else {
        return "N/A".to_string();
    };
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn render_loading(message: &str) -> String {
    format!(
        "<div class=\"channel-feed-loading\"><div class=\"loading-spinner\"></div><div>{}</div></div>",
        esc(message)
    )
}

fn thumbnail_img(src: &str, name: &str) -> String {
    let fallback = format!(
        "{PLACEHOLDER_IMAGE_BASE}?text={}",
        utf8_percent_encode(name, SCRIPT_STRING)
    );
    format!(
        "<img src=\"{}\" alt=\"{}\" onerror=\"this.src='{}'\">",
        esc(src),
        esc(name),
        esc(&fallback)
    )
}

pub fn render_channel_item(summary: &ChannelSummary) -> String {
    format!(
        "<div class=\"channel-feed-item\" data-channel-id=\"{id}\">\
         <div class=\"channel-feed-thumbnail\">{img}</div>\
         <div class=\"channel-feed-name\">{name}</div>\
         </div>",
        id = esc(&summary.id),
        img = thumbnail_img(&summary.thumbnail_url, &summary.name),
        name = esc(&summary.name),
    )
}

/// One clickable element per channel, in the order given.
pub fn render_channel_list(summaries: &[ChannelSummary], api_key_present: bool) -> String {
    if summaries.is_empty() {
        return "<div class=\"channel-feed-note\">No channels found - check your configuration</div>"
            .to_string();
    }
    let mut html = String::new();
    for summary in summaries {
        html.push_str(&render_channel_item(summary));
    }
    if !api_key_present {
        html.push_str(
            "<div class=\"channel-feed-note\">Using placeholder data - YouTube API key unavailable</div>",
        );
    }
    html
}

pub fn render_player(video_id: Option<&str>) -> String {
    match video_id {
        Some(id) => format!(
            "<div class=\"channel-feed-player\"><iframe width=\"100%\" height=\"100%\" \
             src=\"{}\" frameborder=\"0\" \
             allow=\"accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture\" \
             allowfullscreen></iframe></div>",
            esc(&youtube::embed_url(id))
        ),
        None => "<div class=\"channel-feed-player empty\"><div class=\"channel-feed-empty-player\">\
                 <div>No videos available</div></div></div>"
            .to_string(),
    }
}

fn video_item(id: &str, title: &str, thumbnail: &str, date: &str) -> String {
    format!(
        "<div class=\"channel-feed-video\" data-video-id=\"{}\">\
         <div class=\"channel-feed-video-thumbnail\"><img src=\"{}\" alt=\"{}\"></div>\
         <div class=\"channel-feed-video-info\">\
         <div class=\"channel-feed-video-title\">{}</div>\
         <div class=\"channel-feed-video-date\">{}</div>\
         </div></div>",
        esc(id),
        esc(thumbnail),
        esc(title),
        esc(title),
        esc(date)
    )
}

pub fn render_video_list(videos: &VideoList) -> String {
    let mut html = String::new();
    match videos {
        VideoList::Live(list) => {
            html.push_str("<div class=\"channel-feed-videos-header\">Latest Videos</div>");
            html.push_str("<div class=\"channel-feed-videos-grid\">");
            for video in list {
                html.push_str(&video_item(
                    &video.id,
                    &video.title,
                    &video.thumbnail_url,
                    &video.published_at,
                ));
            }
            html.push_str("</div>");
        }
        VideoList::Fallback(list) => {
            html.push_str(
                "<div class=\"channel-feed-videos-header\">Sample Videos (API key needed for channel videos)</div>",
            );
            html.push_str("<div class=\"channel-feed-videos-grid\">");
            for video in list {
                html.push_str(&video_item(
                    &video.id,
                    &video.title,
                    &youtube::video_thumbnail_url(&video.id),
                    "Sample",
                ));
            }
            html.push_str("</div>");
        }
        VideoList::Empty { api_key_present } => {
            let label = if *api_key_present {
                "No videos found"
            } else {
                "Videos unavailable - API key needed"
            };
            let _ = write!(html, "<div class=\"channel-feed-videos-header\">{label}</div>");
        }
    }
    html
}

pub fn modal_title(detail: &ChannelDetail) -> String {
    if detail.summary.name.trim().is_empty() {
        format!("Channel {}", detail.summary.id)
    } else {
        detail.summary.name.clone()
    }
}

pub fn render_channel_detail(detail: &ChannelDetail, player_video: Option<&str>) -> String {
    let summary = &detail.summary;
    let description = match &summary.description {
        Some(text) => truncate_description(text),
        None => "No description available".to_string(),
    };
    format!(
        "<h3 class=\"channel-feed-modal-title\">{title}</h3>\
         <div class=\"channel-feed-info\">\
         <div class=\"channel-feed-thumbnail\">{img}</div>\
         <div class=\"channel-feed-details\">\
         <div class=\"channel-feed-description\">{description}</div>\
         <div class=\"channel-feed-stats\">\
         <div class=\"channel-feed-subscribers\">Subscribers: {subscribers}</div>\
         <div class=\"channel-feed-video-count\">Videos: {videos}</div>\
         <a href=\"{link}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"channel-feed-link\">Visit Channel</a>\
         </div></div></div>\
         <div class=\"channel-feed-video-player\">{player}</div>\
         <div class=\"channel-feed-videos\">{list}</div>",
        title = esc(&modal_title(detail)),
        img = thumbnail_img(&summary.thumbnail_url, &summary.name),
        description = esc(&description),
        subscribers = format_count(summary.subscriber_count),
        videos = format_count(summary.video_count),
        link = esc(&youtube::channel_url(&summary.id)),
        player = render_player(player_video),
        list = render_video_list(&detail.videos),
    )
}

pub fn render_error(detail: &str) -> String {
    format!(
        "<div class=\"channel-feed-error\"><div>Error loading channel content</div>\
         <div class=\"channel-feed-error-details\">{}</div></div>",
        esc(detail)
    )
}

/// Body of the modal for whatever state the controller is in.
pub fn render_modal_body(modal: &ModalController) -> String {
    match modal.content() {
        ModalContent::Empty => String::new(),
        ModalContent::Loading => render_loading("Loading channel content..."),
        ModalContent::Detail(detail) => render_channel_detail(detail, modal.player().source()),
        ModalContent::Failed(message) => render_error(message),
    }
}
