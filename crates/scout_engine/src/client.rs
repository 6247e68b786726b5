use crate::config::ScoutConfig;
use crate::{ChannelRef, ClientError, FoundMessage, GlobalHit};

/// Authenticated access to the messaging platform.
///
/// A client is created disconnected; callers connect it, use it, and
/// disconnect it exactly once on the way out.
#[async_trait::async_trait]
pub trait SearchClient: Send {
    async fn connect(&mut self) -> Result<(), ClientError>;

    async fn is_authorized(&mut self) -> Result<bool, ClientError>;

    /// Fails with [`ClientError::ChannelNotFound`] for unknown or invalid handles.
    async fn resolve_channel(&mut self, handle: &str) -> Result<ChannelRef, ClientError>;

    /// Messages of `channel` matching `keyword`, newest first, at most `limit`.
    async fn search_channel(
        &mut self,
        channel: &ChannelRef,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<FoundMessage>, ClientError>;

    /// Messages matching `keyword` across all public broadcast channels.
    async fn search_global(&mut self, keyword: &str, limit: u32)
        -> Result<Vec<GlobalHit>, ClientError>;

    async fn disconnect(&mut self);
}

/// Builds a fresh, not yet connected client for one unit of work.
pub trait ClientFactory: Send + Sync {
    fn create(&self, config: &ScoutConfig) -> Result<Box<dyn SearchClient>, ClientError>;
}

/// Factory for builds without a platform backend; every scrape fails fast.
#[derive(Debug, Clone)]
pub struct UnavailableClientFactory {
    reason: String,
}

impl UnavailableClientFactory {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ClientFactory for UnavailableClientFactory {
    fn create(&self, _config: &ScoutConfig) -> Result<Box<dyn SearchClient>, ClientError> {
        Err(ClientError::Unavailable(self.reason.clone()))
    }
}
