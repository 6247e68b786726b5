//! Scout engine: platform client seam, scrape orchestration, and discovery.
mod bridge;
mod client;
mod config;
mod discovery;
mod orchestrator;
mod persist;
mod report;
#[cfg(feature = "telegram")]
mod telegram;
mod types;

pub use bridge::ScrapeBridge;
pub use client::{ClientFactory, SearchClient, UnavailableClientFactory};
pub use config::{
    ConfigError, Credentials, ScoutConfig, API_HASH_VAR, API_ID_VAR, DEFAULT_SESSION_FILE,
    DEFAULT_SYSTEM_VERSION, SESSION_FILE_VAR,
};
pub use discovery::{
    discover, run_discovery, DiscoveryError, DiscoveryOutcome, DiscoveryRecord, DiscoverySettings,
};
pub use orchestrator::{Orchestrator, ScrapeStream};
pub use persist::{ensure_output_dir, write_atomically, PersistError};
pub use report::{DiscoveryReport, ReportError, REPORT_COLUMNS};
#[cfg(feature = "telegram")]
pub use telegram::{TelegramClientFactory, TelegramSearchClient};
pub use types::{ChannelInfo, ChannelRef, ClientError, FoundMessage, GlobalHit, ScrapeId};
