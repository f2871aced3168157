use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::warn;

use crate::feed::{Feed, SectionEvent};
use crate::modal::{Dismiss, ModalContent, ModalPhase};
use crate::model::{ChannelDetail, ChannelSummary, VideoList};
use crate::render;
use crate::youtube;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK_RATE: Duration = Duration::from_millis(120);

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= TICK_RATE {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

pub struct Options {
    pub feed: Feed,
    pub config_path: String,
}

pub struct Model {
    feed: Feed,
    config_path: String,
    status_message: String,
    selected_channel: usize,
    selected_video: usize,
    popup_area: Option<Rect>,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let mut model = Self {
            feed: options.feed,
            config_path: options.config_path,
            status_message: "Loading channels…".to_string(),
            selected_channel: 0,
            selected_video: 0,
            popup_area: None,
            spinner: Spinner::new(),
            needs_redraw: true,
        };
        let section = model.feed.options().section.clone();
        model
            .feed
            .notify(SectionEvent::Selected(section), Instant::now());
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = TICK_RATE
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= TICK_RATE {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.feed.is_list_loading() || self.feed.modal().phase() == ModalPhase::Opening
    }

    fn poll_async(&mut self) -> bool {
        let was_loading = self.feed.is_list_loading();
        let was_opening = self.feed.modal().phase() == ModalPhase::Opening;
        let changed = self.feed.poll(Instant::now());

        if was_loading && !self.feed.is_list_loading() {
            self.status_message = self.list_status();
        }
        if was_opening && self.feed.modal().phase() == ModalPhase::Open {
            self.selected_video = 0;
            self.status_message = match self.feed.modal().content() {
                ModalContent::Failed(_) => "Could not load channel.".to_string(),
                _ => "Enter plays the highlighted video, Esc closes.".to_string(),
            };
        }
        let max = self.feed.summaries().len().saturating_sub(1);
        self.selected_channel = self.selected_channel.min(max);
        changed
    }

    fn list_status(&self) -> String {
        let count = self.feed.summaries().len();
        if self.feed.api_key_present() {
            format!("{count} channel(s). Enter opens a channel, q quits.")
        } else {
            format!(
                "{count} channel(s) with placeholder data. Add a YouTube API key in {}.",
                self.config_path
            )
        }
    }

    fn current_channel(&self) -> Option<&ChannelSummary> {
        self.feed.summaries().get(self.selected_channel)
    }

    fn current_detail(&self) -> Option<&ChannelDetail> {
        match self.feed.modal().content() {
            ModalContent::Detail(detail) => Some(detail),
            _ => None,
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.feed.modal().is_visible() {
            return Ok(self.handle_modal_key(code));
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_channel + 1 < self.feed.summaries().len() {
                    self.selected_channel += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_channel = self.selected_channel.saturating_sub(1);
            }
            KeyCode::Enter => {
                if !self.feed.list().is_displayed() {
                    return Ok(false);
                }
                if let Some(channel) = self.current_channel() {
                    let (id, name) = (channel.id.clone(), channel.name.clone());
                    self.feed.open_channel(&id);
                    self.status_message = format!("Loading {name}…");
                }
            }
            KeyCode::Char('o') => {
                if let Some(channel) = self.current_channel() {
                    let url = youtube::channel_url(&channel.id);
                    self.open_in_browser(&url);
                }
            }
            KeyCode::Char('s') => {
                let section = self.feed.options().section.clone();
                self.feed
                    .notify(SectionEvent::Selected(section), Instant::now());
                self.status_message = "Section selected.".to_string();
            }
            KeyCode::Char('x') => {
                self.feed.notify(SectionEvent::Closed, Instant::now());
                self.status_message = "Section closed. Press s to bring it back.".to_string();
            }
            KeyCode::Char('r') => {
                self.feed.load_channels();
                self.selected_channel = 0;
                self.status_message = "Reloading channels…".to_string();
            }
            _ => return Ok(false),
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_modal_key(&mut self, code: KeyCode) -> bool {
        let video_count = self.current_detail().map_or(0, |d| d.videos.len());
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                self.feed.close(Dismiss::EscapeKey, Instant::now());
                self.status_message = self.list_status();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_video + 1 < video_count {
                    self.selected_video += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_video = self.selected_video.saturating_sub(1);
            }
            KeyCode::Enter => {
                let picked = self
                    .current_detail()
                    .and_then(|d| d.videos.get(self.selected_video))
                    .map(|(id, title)| (id.to_string(), title.to_string()));
                if let Some((id, title)) = picked {
                    if self.feed.select_video(&id) {
                        self.status_message = format!("Playing {title}");
                    }
                }
            }
            KeyCode::Char('o') => {
                if let Some(id) = self.feed.modal().channel_id() {
                    let url = youtube::channel_url(id);
                    self.open_in_browser(&url);
                }
            }
            KeyCode::Char('v') => {
                if let Some(id) = self.feed.modal().player().source() {
                    let url = youtube::watch_url(id);
                    self.open_in_browser(&url);
                }
            }
            _ => return false,
        }
        self.mark_dirty();
        false
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(area) = self.popup_area else {
                    return;
                };
                if self.feed.modal().is_visible() && !contains(area, event.column, event.row) {
                    self.feed.close(Dismiss::OverlayClick, Instant::now());
                    self.status_message = self.list_status();
                    self.mark_dirty();
                }
            }
            MouseEventKind::ScrollDown => {
                let _ = self.handle_key(KeyCode::Down);
            }
            MouseEventKind::ScrollUp => {
                let _ = self.handle_key(KeyCode::Up);
            }
            _ => {}
        }
    }

    fn open_in_browser(&mut self, url: &str) {
        match webbrowser::open(url) {
            Ok(_) => {
                self.status_message = format!("Opened {url} in your browser.");
            }
            Err(err) => {
                warn!(error = %err, "browser launch failed");
                self.status_message = format!("Failed to open browser: {err} (URL: {url})");
            }
        }
    }

    fn footer_text(&self) -> &'static str {
        if self.feed.modal().is_visible() {
            "j/k videos · Enter play · v watch in browser · o channel page · Esc close · q quit"
        } else {
            "j/k move · Enter open · o channel page · s/x select/close section · r reload · q quit"
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_channels(frame, layout[1]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);

        if self.feed.modal().is_displayed() {
            self.draw_modal(frame, layout[1]);
        } else {
            self.popup_area = None;
        }
    }

    fn draw_channels(&self, frame: &mut Frame<'_>, area: Rect) {
        let list_state = self.feed.list();
        let leaving = list_state.is_displayed()
            && list_state.state() == crate::feed::ListState::Hidden;
        let border = if leaving {
            COLOR_BORDER_IDLE
        } else {
            COLOR_BORDER_FOCUSED
        };
        let block = Block::default()
            .title(Span::styled(
                "Channels",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG));

        if !list_state.is_displayed() {
            let hint = Paragraph::new("Section hidden. Press s to select it.")
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(hint, area);
            return;
        }

        let summaries = self.feed.summaries();
        if summaries.is_empty() {
            let message = if self.feed.is_list_loading() {
                "Loading channels..."
            } else {
                "No channels configured"
            };
            let body = Paragraph::new(message)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .block(block);
            frame.render_widget(body, area);
            return;
        }

        let items: Vec<ListItem> = summaries.iter().map(channel_item).collect();
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(COLOR_PANEL_SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(self.selected_channel));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_modal(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let popup_area = centered_rect(80, 80, area);
        self.popup_area = Some(popup_area);
        frame.render_widget(Clear, popup_area);

        let modal = self.feed.modal();
        let (title, body) = match modal.content() {
            ModalContent::Empty | ModalContent::Loading => (
                "Loading".to_string(),
                Text::from(Line::from(Span::styled(
                    "Loading channel content...",
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ))),
            ),
            ModalContent::Failed(detail) => (
                "Error".to_string(),
                Text::from(vec![
                    Line::from(Span::styled(
                        "Error loading channel content",
                        Style::default()
                            .fg(COLOR_ERROR)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        detail.clone(),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )),
                ]),
            ),
            ModalContent::Detail(detail) => (
                render::modal_title(detail),
                Text::from(detail_lines(
                    detail,
                    modal.player().source(),
                    self.selected_video,
                )),
            ),
        };

        let border = if modal.phase() == ModalPhase::Closing {
            COLOR_BORDER_IDLE
        } else {
            COLOR_ACCENT
        };
        let popup = Paragraph::new(body)
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(popup, popup_area);
    }
}

fn channel_item(summary: &ChannelSummary) -> ListItem<'static> {
    let mut title = vec![Span::styled(
        summary.name.clone(),
        Style::default()
            .fg(COLOR_TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD),
    )];
    if summary.is_placeholder() {
        title.push(Span::styled(
            "  (placeholder)",
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ));
    }
    let stats = format!(
        "{} subscribers · {} videos",
        render::format_count(summary.subscriber_count),
        render::format_count(summary.video_count)
    );
    ListItem::new(vec![
        Line::from(title),
        Line::from(Span::styled(stats, Style::default().fg(COLOR_TEXT_SECONDARY))),
    ])
}

fn detail_lines(
    detail: &ChannelDetail,
    playing: Option<&str>,
    selected: usize,
) -> Vec<Line<'static>> {
    let summary = &detail.summary;
    let secondary = Style::default().fg(COLOR_TEXT_SECONDARY);
    let mut lines = Vec::new();

    let description = summary
        .description
        .as_deref()
        .map(render::truncate_description)
        .unwrap_or_else(|| "No description available".to_string());
    lines.push(Line::from(Span::styled(
        description,
        Style::default().fg(COLOR_TEXT_PRIMARY),
    )));
    lines.push(Line::from(Span::styled(
        format!(
            "Subscribers: {}   Videos: {}",
            render::format_count(summary.subscriber_count),
            render::format_count(summary.video_count)
        ),
        secondary,
    )));
    lines.push(Line::from(Span::styled(
        youtube::channel_url(&summary.id),
        Style::default().fg(COLOR_ACCENT),
    )));
    lines.push(Line::default());

    match playing {
        Some(id) => lines.push(Line::from(Span::styled(
            format!("▶ Now playing: {}", youtube::embed_url(id)),
            Style::default().fg(COLOR_SUCCESS),
        ))),
        None => lines.push(Line::from(Span::styled("No videos available", secondary))),
    }
    lines.push(Line::default());

    let header = match &detail.videos {
        VideoList::Live(_) => "Latest Videos".to_string(),
        VideoList::Fallback(_) => "Sample Videos (API key needed for channel videos)".to_string(),
        VideoList::Empty { api_key_present: true } => "No videos found".to_string(),
        VideoList::Empty { api_key_present: false } => {
            "Videos unavailable - API key needed".to_string()
        }
    };
    lines.push(Line::from(Span::styled(
        header,
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD),
    )));

    for index in 0..detail.videos.len() {
        let Some((id, title)) = detail.videos.get(index) else {
            break;
        };
        let date = match &detail.videos {
            VideoList::Live(videos) => videos[index].published_at.clone(),
            _ => "Sample".to_string(),
        };
        let marker = if index == selected { "›" } else { " " };
        let mut style = Style::default().fg(COLOR_TEXT_PRIMARY);
        if index == selected {
            style = style.bg(COLOR_PANEL_SELECTED_BG);
        }
        if Some(id) == playing {
            style = style.add_modifier(Modifier::BOLD);
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} {title}"), style),
            Span::styled(format!("  {date}"), secondary),
        ]));
    }

    lines
}
