use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, Stream};
use scout_core::{DataEvent, ScrapeEvent, ScrapeRequest};
use scout_logging::{scout_debug, scout_info, scout_warn};
use tokio_util::sync::CancellationToken;

use crate::bridge::panic_message;
use crate::client::ClientFactory;
use crate::config::{ConfigError, ScoutConfig};
use crate::{ClientError, ScrapeId};

/// Lazy event sequence of one scrape. Always ends with [`ScrapeEvent::Done`].
pub type ScrapeStream = Pin<Box<dyn Stream<Item = ScrapeEvent> + Send>>;

/// Drives a search client through the channel × keyword matrix of a request.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<ScoutConfig>,
    factory: Arc<dyn ClientFactory>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(config: Arc<ScoutConfig>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Starts a scrape. Nothing happens until the returned stream is polled.
    ///
    /// Once `cancel` fires, no further searches are issued and any flood wait
    /// is cut short; the stream still disconnects the client and ends with
    /// the usual closing log line and `Done`.
    pub fn run(
        &self,
        scrape_id: ScrapeId,
        request: ScrapeRequest,
        cancel: CancellationToken,
    ) -> ScrapeStream {
        let config = Arc::clone(&self.config);
        let factory = Arc::clone(&self.factory);

        Box::pin(async_stream::stream! {
            if let Some(problem) = precondition_failure(&config, &request) {
                scout_warn!("scrape {scrape_id}: rejected: {problem}");
                yield ScrapeEvent::log(problem);
                yield ScrapeEvent::Done;
                return;
            }

            yield ScrapeEvent::log("Initializing Telegram client...");
            let mut client = match factory.create(&config) {
                Ok(client) => client,
                Err(err) => {
                    scout_warn!("scrape {scrape_id}: client construction failed: {err}");
                    yield ScrapeEvent::log(format!("ERROR: Could not create the Telegram client: {err}"));
                    yield ScrapeEvent::Done;
                    return;
                }
            };

            let mut connected = false;
            'scrape: {
                yield ScrapeEvent::log("Connecting using existing session...");
                if let Err(err) = guarded(client.connect()).await {
                    scout_warn!("scrape {scrape_id}: connect failed: {err}");
                    yield ScrapeEvent::log(critical(&err));
                    break 'scrape;
                }
                connected = true;

                match guarded(client.is_authorized()).await {
                    Ok(true) => {}
                    Ok(false) => {
                        scout_warn!("scrape {scrape_id}: session not authorized");
                        yield ScrapeEvent::log(format!(
                            "ERROR: Server session is not authorized. The '{}' file is invalid or expired.",
                            config.session_path().display()
                        ));
                        break 'scrape;
                    }
                    Err(err) => {
                        yield ScrapeEvent::log(critical(&err));
                        break 'scrape;
                    }
                }
                yield ScrapeEvent::log("Client connected successfully.");

                let keywords = request.active_keywords();
                let mut total_found = 0usize;

                for channel in request.active_channels() {
                    if cancel.is_cancelled() {
                        break 'scrape;
                    }
                    scout_debug!("scrape {scrape_id}: channel @{channel}");
                    yield ScrapeEvent::log(format!("--- Searching Channel: @{channel} ---"));

                    let entity = match guarded(client.resolve_channel(channel)).await {
                        Ok(entity) => entity,
                        Err(Interrupt::Client(ClientError::ChannelNotFound(_))) => {
                            yield ScrapeEvent::log(format!(
                                "Error: Could not find channel @{channel}. Skipping."
                            ));
                            continue;
                        }
                        Err(Interrupt::Client(ClientError::FloodWait { seconds })) => {
                            yield ScrapeEvent::log(flood_wait_message(seconds));
                            if !pause(Duration::from_secs(seconds), &cancel).await {
                                break 'scrape;
                            }
                            yield ScrapeEvent::log(format!("Skipping @{channel} after the flood wait."));
                            continue;
                        }
                        Err(Interrupt::Client(err)) => {
                            yield ScrapeEvent::log(format!("An error occurred with @{channel}: {err}"));
                            continue;
                        }
                        Err(err @ Interrupt::Panicked(_)) => {
                            yield ScrapeEvent::log(critical(&err));
                            break 'scrape;
                        }
                    };

                    for keyword in keywords.iter().copied() {
                        if cancel.is_cancelled() {
                            break 'scrape;
                        }
                        yield ScrapeEvent::log(format!("Searching for keyword: '{keyword}'..."));

                        match guarded(client.search_channel(&entity, keyword, request.limit)).await {
                            Ok(messages) => {
                                let mut seen = HashSet::new();
                                let mut message_count = 0usize;
                                for message in messages.iter().filter(|message| seen.insert(message.id)) {
                                    message_count += 1;
                                    yield ScrapeEvent::Data(DataEvent::new(
                                        channel,
                                        keyword,
                                        message.id,
                                        &message.date,
                                        message.text.as_deref(),
                                    ));
                                }
                                yield ScrapeEvent::log(format!(
                                    "Found {message_count} messages for '{keyword}'."
                                ));
                                total_found += message_count;
                            }
                            Err(Interrupt::Client(ClientError::FloodWait { seconds })) => {
                                scout_warn!("scrape {scrape_id}: flood wait of {seconds}s on @{channel}");
                                yield ScrapeEvent::log(flood_wait_message(seconds));
                                if !pause(Duration::from_secs(seconds), &cancel).await {
                                    break 'scrape;
                                }
                            }
                            Err(Interrupt::Client(err)) => {
                                yield ScrapeEvent::log(format!("Error searching for '{keyword}': {err}"));
                            }
                            Err(err @ Interrupt::Panicked(_)) => {
                                yield ScrapeEvent::log(critical(&err));
                                break 'scrape;
                            }
                        }
                    }
                }

                scout_info!("scrape {scrape_id}: found {total_found} messages");
                yield ScrapeEvent::log(format!("Found a total of {total_found} messages."));
            }

            if cancel.is_cancelled() {
                scout_info!("scrape {scrape_id}: cancelled");
                yield ScrapeEvent::log("Scrape cancelled.");
            }
            if connected
                && AssertUnwindSafe(client.disconnect())
                    .catch_unwind()
                    .await
                    .is_err()
            {
                scout_warn!("scrape {scrape_id}: client panicked while disconnecting");
            }
            scout_debug!("scrape {scrape_id}: disconnected");
            yield ScrapeEvent::log("Client disconnected. Scrape finished.");
            yield ScrapeEvent::Done;
        })
    }
}

/// Validation run before any client is built, in a fixed order.
fn precondition_failure(config: &ScoutConfig, request: &ScrapeRequest) -> Option<String> {
    match config.check() {
        Err(ConfigError::MissingSession(path)) => {
            return Some(format!(
                "ERROR: Server-side session file '{}' not found. The app is not configured correctly.",
                path.display()
            ));
        }
        Err(ConfigError::MissingCredentials) => {
            return Some("ERROR: Server is missing API_ID/API_HASH configuration.".to_string());
        }
        Ok(_) => {}
    }
    if request.active_channels().is_empty() {
        return Some(
            "ERROR: No channels were provided. Please enter at least one @username.".to_string(),
        );
    }
    if request.active_keywords().is_empty() {
        return Some(
            "ERROR: No keywords were provided. Please enter at least one keyword.".to_string(),
        );
    }
    None
}

fn flood_wait_message(seconds: u64) -> String {
    format!("Flood wait error. Sleeping for {seconds} seconds.")
}

fn critical(err: &Interrupt) -> String {
    format!("--- A critical error occurred: {err} ---")
}

/// Sleeps for `duration`. Returns `false` when cancelled first.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Why a client call did not produce a value.
pub(crate) enum Interrupt {
    Client(ClientError),
    Panicked(String),
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Client(err) => write!(f, "{err}"),
            Interrupt::Panicked(message) => write!(f, "client panicked: {message}"),
        }
    }
}

/// Runs a client call, turning a panic inside it into an [`Interrupt`].
pub(crate) async fn guarded<T, F>(call: F) -> Result<T, Interrupt>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result.map_err(Interrupt::Client),
        Err(panic) => Err(Interrupt::Panicked(panic_message(panic.as_ref()))),
    }
}
