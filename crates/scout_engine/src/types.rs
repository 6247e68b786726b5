use chrono::{DateTime, Utc};
use thiserror::Error;

/// Correlates server-side log lines of one scrape.
pub type ScrapeId = u64;

/// A message returned by a search, in platform order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    /// `None` for media-only messages.
    pub text: Option<String>,
}

/// A channel handle resolved to the platform's internal reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub handle: String,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: i64,
    /// Public `@username`, absent for private channels.
    pub username: Option<String>,
    pub title: String,
}

/// One result of a global search. `channel` is `None` outside broadcast channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalHit {
    pub message: FoundMessage,
    pub channel: Option<ChannelInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("A wait of {seconds} seconds is required")]
    FloodWait { seconds: u64 },
    #[error("No channel could be found for '{0}'")]
    ChannelNotFound(String),
    #[error("client is not connected")]
    NotConnected,
    #[error("{0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Rpc(String),
}
