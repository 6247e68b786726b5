use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scout_core::clean_snippet;
use scout_logging::{scout_info, scout_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientFactory, SearchClient};
use crate::config::{ConfigError, ScoutConfig};
use crate::orchestrator::{guarded, pause, Interrupt};
use crate::{ClientError, GlobalHit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub keywords: Vec<String>,
    pub limit_per_keyword: u32,
    /// Sleep after every keyword, successful or not.
    pub politeness_delay: Duration,
    pub snippet_chars: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            limit_per_keyword: 10,
            politeness_delay: Duration::from_secs(5),
            snippet_chars: 150,
        }
    }
}

/// A message found in a broadcast channel by a global search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    pub date: DateTime<Utc>,
    pub channel_username: Option<String>,
    pub channel_title: String,
    pub keyword: String,
    pub snippet: String,
    pub link: Option<String>,
    pub channel_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub records: Vec<DiscoveryRecord>,
    /// Usernames of public channels with at least one hit.
    pub channels: BTreeSet<String>,
    pub failed_keywords: usize,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start client: {0}")]
    Client(ClientError),
    #[error("session is not authorized; create it with an interactive login first")]
    Unauthorized,
    #[error("client panicked: {0}")]
    Panicked(String),
}

fn startup_error(interrupt: Interrupt) -> DiscoveryError {
    match interrupt {
        Interrupt::Client(err) => DiscoveryError::Client(err),
        Interrupt::Panicked(message) => DiscoveryError::Panicked(message),
    }
}

/// Builds a client, runs [`discover`], and always disconnects afterwards.
pub async fn run_discovery(
    factory: &dyn ClientFactory,
    config: &ScoutConfig,
    settings: &DiscoverySettings,
    cancel: &CancellationToken,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    config.check()?;
    let mut client = factory.create(config).map_err(DiscoveryError::Client)?;

    scout_info!("Connecting to Telegram...");
    guarded(client.connect()).await.map_err(startup_error)?;

    let result = match guarded(client.is_authorized()).await {
        Ok(true) => {
            scout_info!("Client connected successfully.");
            Ok(discover(client.as_mut(), settings, cancel).await)
        }
        Ok(false) => Err(DiscoveryError::Unauthorized),
        Err(err) => Err(startup_error(err)),
    };

    client.disconnect().await;
    scout_info!("Client disconnected.");
    result
}

/// Searches globally for every keyword and collects channel hits.
pub async fn discover(
    client: &mut dyn SearchClient,
    settings: &DiscoverySettings,
    cancel: &CancellationToken,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();

    for keyword in settings.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        if cancel.is_cancelled() {
            break;
        }
        scout_info!("--- Searching globally for keyword: '{keyword}' ---");

        match guarded(client.search_global(keyword, settings.limit_per_keyword)).await {
            Ok(hits) => {
                scout_info!("Found {} messages for '{keyword}'.", hits.len());
                for hit in hits {
                    if let Some(record) = to_record(hit, keyword, settings.snippet_chars) {
                        if let Some(username) = &record.channel_username {
                            outcome.channels.insert(username.clone());
                        }
                        outcome.records.push(record);
                    }
                }
            }
            Err(Interrupt::Client(ClientError::FloodWait { seconds })) => {
                outcome.failed_keywords += 1;
                scout_warn!("Flood wait error. Sleeping for {seconds} seconds.");
                if !pause(Duration::from_secs(seconds), cancel).await {
                    break;
                }
            }
            Err(err) => {
                outcome.failed_keywords += 1;
                scout_warn!("Error searching for '{keyword}': {err}");
            }
        }

        scout_info!(
            "Sleeping for {} seconds to be polite to API...",
            settings.politeness_delay.as_secs()
        );
        if !pause(settings.politeness_delay, cancel).await {
            break;
        }
    }

    outcome
}

fn to_record(hit: GlobalHit, keyword: &str, snippet_chars: usize) -> Option<DiscoveryRecord> {
    let channel = hit.channel?;
    let link = channel
        .username
        .as_deref()
        .map(|username| scout_core::deep_link(username, hit.message.id));
    Some(DiscoveryRecord {
        date: hit.message.date,
        channel_username: channel.username,
        channel_title: channel.title,
        keyword: keyword.to_string(),
        snippet: clean_snippet(hit.message.text.as_deref(), snippet_chars),
        link,
        channel_id: channel.id,
    })
}
