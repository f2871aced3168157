#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod logging;
pub mod modal;
pub mod model;
pub mod render;
pub mod resolver;
pub mod ui;
pub mod youtube;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{render_channel, render_list, run};
pub use error::FeedError;
pub use feed::{Feed, FeedOptions, SectionEvent};
