use thiserror::Error;

/// Failure classes of the feed. None of them are fatal: each one has a
/// degraded rendering that the caller falls back to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("no usable channel configuration after probing {tried} location(s)")]
    ConfigUnavailable { tried: usize },
    #[error("youtube api key unavailable")]
    KeyUnavailable,
    #[error("remote fetch failed: {0}")]
    RemoteFetchFailed(String),
    #[error("Channel {0} not found in config")]
    UnknownChannel(String),
    #[error("render target missing: {0}")]
    UnexpectedRenderTarget(&'static str),
}

impl FeedError {
    pub fn remote(err: &anyhow::Error) -> Self {
        FeedError::RemoteFetchFailed(format!("{err:#}"))
    }
}
