use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "CHANNEL_FEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    crate::youtube::YOUTUBE_API_BASE.to_string()
}

fn default_user_agent() -> String {
    format!("channel-feed/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

/// Keys held by neighbouring integrations that may share the YouTube key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub tmdb: TmdbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TmdbConfig {
    #[serde(default)]
    pub youtube_api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_site_root")]
    pub root: String,
    #[serde(default = "default_api_config_path")]
    pub api_config_path: String,
    #[serde(default = "default_channel_config_paths")]
    pub channel_config_paths: Vec<String>,
    #[serde(default = "default_section")]
    pub section: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: default_site_root(),
            api_config_path: default_api_config_path(),
            channel_config_paths: default_channel_config_paths(),
            section: default_section(),
        }
    }
}

fn default_site_root() -> String {
    ".".into()
}

fn default_api_config_path() -> String {
    "/api/api-config.json".into()
}

fn default_channel_config_paths() -> Vec<String> {
    vec![
        "/youtube/yt-config.json".into(),
        "/yt-config.json".into(),
        "youtube/yt-config.json".into(),
        "yt-config.json".into(),
    ]
}

fn default_section() -> String {
    "kavita".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_animation", with = "humantime_serde")]
    pub animation: Duration,
    #[serde(default = "default_show_delay", with = "humantime_serde")]
    pub show_delay: Duration,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            animation: default_animation(),
            show_delay: default_show_delay(),
            date_format: default_date_format(),
        }
    }
}

fn default_animation() -> Duration {
    Duration::from_millis(800)
}

fn default_show_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_date_format() -> String {
    "%-m/%-d/%Y".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = apply_env(cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.youtube.api_key.is_empty() {
        base.youtube.api_key = other.youtube.api_key;
    }
    if !other.youtube.api_base.is_empty() {
        base.youtube.api_base = other.youtube.api_base;
    }
    if !other.youtube.user_agent.is_empty() {
        base.youtube.user_agent = other.youtube.user_agent;
    }
    base.youtube.timeout = other.youtube.timeout;

    if !other.integrations.tmdb.youtube_api_key.is_empty() {
        base.integrations.tmdb.youtube_api_key = other.integrations.tmdb.youtube_api_key;
    }

    if !other.site.root.is_empty() {
        base.site.root = other.site.root;
    }
    if !other.site.api_config_path.is_empty() {
        base.site.api_config_path = other.site.api_config_path;
    }
    if !other.site.channel_config_paths.is_empty() {
        base.site.channel_config_paths = other.site.channel_config_paths;
    }
    if !other.site.section.is_empty() {
        base.site.section = other.site.section;
    }

    base.ui.animation = other.ui.animation;
    base.ui.show_delay = other.ui.show_delay;
    if !other.ui.date_format.is_empty() {
        base.ui.date_format = other.ui.date_format;
    }

    base
}

fn apply_env(mut cfg: Config, prefix: &str) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "youtube.api_key" => cfg.youtube.api_key = value,
        "youtube.api_base" => cfg.youtube.api_base = value,
        "youtube.user_agent" => cfg.youtube.user_agent = value,
        "youtube.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.youtube.timeout = duration;
            }
        }
        "integrations.tmdb.youtube_api_key" => cfg.integrations.tmdb.youtube_api_key = value,
        "site.root" => cfg.site.root = value,
        "site.api_config_path" => cfg.site.api_config_path = value,
        "site.channel_config_paths" => {
            let paths: Vec<String> = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !paths.is_empty() {
                cfg.site.channel_config_paths = paths;
            }
        }
        "site.section" => cfg.site.section = value,
        "ui.animation" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.animation = duration;
            }
        }
        "ui.show_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.show_delay = duration;
            }
        }
        "ui.date_format" => cfg.ui.date_format = value,
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("channel-feed").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/channel-feed.yaml")),
            env_prefix: Some("CHANNEL_FEED_TEST_UNUSED".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.site.section, "kavita");
        assert_eq!(cfg.site.channel_config_paths.len(), 4);
        assert_eq!(cfg.site.channel_config_paths[0], "/youtube/yt-config.json");
        assert_eq!(cfg.ui.animation, Duration::from_millis(800));
        assert!(cfg.youtube.api_key.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "youtube:\n  api_key: file-key\nsite:\n  root: https://media.test/\nui:\n  animation: 250ms\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("CHANNEL_FEED_TEST_UNUSED".into()),
        })
        .unwrap();
        assert_eq!(cfg.youtube.api_key, "file-key");
        assert_eq!(cfg.site.root, "https://media.test/");
        assert_eq!(cfg.ui.animation, Duration::from_millis(250));
        assert_eq!(cfg.ui.show_delay, Duration::from_millis(300));
        assert_eq!(cfg.youtube.api_base, default_api_base());
    }

    #[test]
    fn env_overrides() {
        env::set_var("CHANNEL_FEED_ENVTEST_SITE__SECTION", "plex");
        env::set_var(
            "CHANNEL_FEED_ENVTEST_INTEGRATIONS__TMDB__YOUTUBE_API_KEY",
            "sibling",
        );
        env::set_var("CHANNEL_FEED_ENVTEST_UI__SHOW_DELAY", "1s");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/channel-feed.yaml")),
            env_prefix: Some("CHANNEL_FEED_ENVTEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.site.section, "plex");
        assert_eq!(cfg.integrations.tmdb.youtube_api_key, "sibling");
        assert_eq!(cfg.ui.show_delay, Duration::from_secs(1));
        env::remove_var("CHANNEL_FEED_ENVTEST_SITE__SECTION");
        env::remove_var("CHANNEL_FEED_ENVTEST_INTEGRATIONS__TMDB__YOUTUBE_API_KEY");
        env::remove_var("CHANNEL_FEED_ENVTEST_UI__SHOW_DELAY");
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "ui: [not, a, map]\n").unwrap();
        let err = load(LoadOptions {
            config_file: Some(path),
            env_prefix: None,
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
