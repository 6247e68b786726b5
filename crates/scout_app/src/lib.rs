//! Channel scout application: HTTP relay and discovery command.
pub mod discover;
pub mod server;

use std::sync::Arc;

use scout_engine::ClientFactory;

/// The platform backend compiled into this build.
pub fn client_factory() -> Arc<dyn ClientFactory> {
    #[cfg(feature = "telegram")]
    {
        Arc::new(scout_engine::TelegramClientFactory)
    }
    #[cfg(not(feature = "telegram"))]
    {
        Arc::new(scout_engine::UnavailableClientFactory::new(
            "this build has no Telegram backend; rebuild with `--features telegram`",
        ))
    }
}
