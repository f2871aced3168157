use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{self, Config};
use crate::data::{VideoService, YouTubeVideoService};
use crate::feed::{Feed, FeedOptions};
use crate::resolver::Resolver;
use crate::ui;
use crate::youtube;

struct Setup {
    cfg: Config,
    service: Arc<dyn VideoService>,
    resolver: Resolver,
}

fn setup() -> Result<Setup> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    let client = youtube::Client::new(youtube::ClientConfig {
        user_agent: cfg.youtube.user_agent.clone(),
        base_url: Some(cfg.youtube.api_base.clone()),
        timeout: cfg.youtube.timeout,
        http_client: None,
    })
    .context("create youtube client")?;
    let service: Arc<dyn VideoService> = Arc::new(YouTubeVideoService::new(Arc::new(client)));

    let resolver = Resolver::from_config(&cfg).context("prepare channel resolver")?;
    info!(
        root = %cfg.site.root,
        candidates = resolver.candidates().len(),
        "channel feed configured"
    );

    Ok(Setup {
        cfg,
        service,
        resolver,
    })
}

fn blocking_feed(setup: &Setup) -> Feed {
    Feed::new(
        setup.service.clone(),
        setup.resolver.resolve_api_key(),
        setup.resolver.resolve_channel_config(),
        FeedOptions::from_config(&setup.cfg),
    )
}

/// Runs the interactive terminal browser.
pub fn run() -> Result<()> {
    let setup = setup()?;
    let display_path = friendly_path(config::default_path().as_ref());
    let feed = Feed::mount(
        setup.service.clone(),
        &setup.resolver,
        FeedOptions::from_config(&setup.cfg),
    );

    let mut model = ui::Model::new(ui::Options {
        feed,
        config_path: display_path,
    });
    model.run()
}

/// Loads every channel and returns the list markup.
pub fn render_list() -> Result<String> {
    let setup = setup()?;
    let mut feed = blocking_feed(&setup);
    feed.load_channels_blocking();
    Ok(feed.render_list())
}

/// Loads one channel's detail and returns the modal body markup.
pub fn render_channel(channel_id: &str) -> Result<String> {
    let setup = setup()?;
    let mut feed = blocking_feed(&setup);
    feed.open_channel_blocking(channel_id);
    Ok(feed.render_modal())
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/channel-feed/config.yaml".to_string()
    }
}
