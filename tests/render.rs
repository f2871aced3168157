use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CHANNEL_CONFIG: &str = r#"{
  "kavita": {
    "channels": [
      {"id": "UCaaaaaaaaaaaaaaaaaaaaaa", "name": "First & Best"},
      {"id": "UCbbbbbbbbbbbbbbbbbbbbbb"}
    ],
    "maxResults": 4,
    "fallbackVideos": [
      {"id": "dQw4w9WgXcQ", "title": "Sample One"},
      {"id": "9bZkp7q19f0", "title": "Sample Two"}
    ]
  }
}"#;

struct Site {
    root: TempDir,
    config_home: TempDir,
}

fn site(document: Option<&str>) -> Site {
    let root = TempDir::new().expect("site root");
    if let Some(document) = document {
        fs::write(root.path().join("yt-config.json"), document).expect("write channel config");
    }
    Site {
        root,
        config_home: TempDir::new().expect("config home"),
    }
}

fn command(site: &Site) -> Command {
    let mut cmd = Command::cargo_bin("channel-feed").expect("binary");
    cmd.env("CHANNEL_FEED_SITE__ROOT", path_str(site.root.path()))
        .env("XDG_CONFIG_HOME", path_str(site.config_home.path()))
        .env("HOME", path_str(site.config_home.path()))
        .env("CHANNEL_FEED_YOUTUBE__API_BASE", "http://127.0.0.1:9")
        .env_remove("CHANNEL_FEED_YOUTUBE__API_KEY")
        .env_remove("CHANNEL_FEED_INTEGRATIONS__TMDB__YOUTUBE_API_KEY")
        .env_remove("CHANNEL_FEED_LOG_FILE");
    cmd
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn renders_configured_channels_as_placeholders_without_key() {
    let site = site(Some(CHANNEL_CONFIG));
    command(&site)
        .arg("--render")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "data-channel-id=\"UCaaaaaaaaaaaaaaaaaaaaaa\"",
        ))
        .stdout(predicate::str::contains("First &amp; Best"))
        .stdout(predicate::str::contains("Channel UCbbbb"))
        .stdout(predicate::str::contains(
            "Using placeholder data - YouTube API key unavailable",
        ));
}

#[test]
fn falls_back_to_builtin_channels_when_no_document_exists() {
    let site = site(None);
    command(&site)
        .arg("--render")
        .assert()
        .success()
        .stdout(predicate::str::contains("Raph Retro Comics"))
        .stdout(predicate::str::contains("Dope Comix"));
}

#[test]
fn renders_channel_detail_with_sample_videos() {
    let site = site(Some(CHANNEL_CONFIG));
    command(&site)
        .args(["--render-channel", "UCaaaaaaaaaaaaaaaaaaaaaa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("First &amp; Best"))
        .stdout(predicate::str::contains(
            "Sample Videos (API key needed for channel videos)",
        ))
        .stdout(predicate::str::contains(
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ))
        .stdout(predicate::str::contains("Subscribers: N/A"));
}

#[test]
fn unknown_channel_renders_inline_error() {
    let site = site(Some(CHANNEL_CONFIG));
    command(&site)
        .args(["--render-channel", "UCnotconfigured"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Error loading channel content"))
        .stdout(predicate::str::contains(
            "Channel UCnotconfigured not found in config",
        ));
}

#[test]
fn render_channel_requires_an_id() {
    let site = site(None);
    command(&site)
        .arg("--render-channel")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires a channel id"));
}
