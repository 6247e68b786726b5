use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use futures_util::StreamExt;
use scout_core::{ScrapeEvent, ScrapeRequest};
use scout_logging::{scout_debug, scout_error};
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{Orchestrator, ScrapeStream};
use crate::ScrapeId;

enum BridgeState {
    Running {
        runtime: Runtime,
        stream: ScrapeStream,
    },
    /// Events still owed to the consumer after the orchestrator was abandoned.
    Draining(VecDeque<ScrapeEvent>),
    Finished,
}

/// Blocking iterator over the events of one scrape.
///
/// Each bridge owns a private single-threaded runtime; `next()` drives it
/// until the orchestrator produces its next event. Dropping the bridge early
/// cancels the scrape and runs it to completion so the client is released.
///
/// Must be used from a plain thread, never from inside an async context.
pub struct ScrapeBridge {
    scrape_id: ScrapeId,
    cancel: CancellationToken,
    state: BridgeState,
}

impl ScrapeBridge {
    pub fn start(orchestrator: &Orchestrator, scrape_id: ScrapeId, request: ScrapeRequest) -> Self {
        Self::start_with_cancel(orchestrator, scrape_id, request, CancellationToken::new())
    }

    /// Like [`ScrapeBridge::start`], but the scrape also stops when `cancel` fires,
    /// even while `next()` is blocked in a rate-limit pause.
    pub fn start_with_cancel(
        orchestrator: &Orchestrator,
        scrape_id: ScrapeId,
        request: ScrapeRequest,
        cancel: CancellationToken,
    ) -> Self {
        let state = match Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => BridgeState::Running {
                runtime,
                stream: orchestrator.run(scrape_id, request, cancel.clone()),
            },
            Err(err) => {
                scout_error!("scrape {scrape_id}: could not build runtime: {err}");
                bridge_failure(&err.to_string())
            }
        };
        Self {
            scrape_id,
            cancel,
            state,
        }
    }

    pub fn scrape_id(&self) -> ScrapeId {
        self.scrape_id
    }

    /// Cancels the scrape and drives it to its end, discarding events.
    fn finish_early(&mut self) {
        let BridgeState::Running {
            runtime,
            mut stream,
        } = std::mem::replace(&mut self.state, BridgeState::Finished)
        else {
            return;
        };

        self.cancel.cancel();
        let drained = panic::catch_unwind(AssertUnwindSafe(|| {
            runtime.block_on(async {
                let mut discarded = 0usize;
                while let Some(event) = stream.next().await {
                    discarded += 1;
                    if event.is_done() {
                        break;
                    }
                }
                discarded
            })
        }));
        match drained {
            Ok(discarded) => scout_debug!(
                "scrape {}: stopped early, discarded {discarded} events",
                self.scrape_id
            ),
            Err(payload) => scout_error!(
                "scrape {}: panicked during cleanup: {}",
                self.scrape_id,
                panic_message(payload.as_ref())
            ),
        }
    }
}

impl Iterator for ScrapeBridge {
    type Item = ScrapeEvent;

    fn next(&mut self) -> Option<ScrapeEvent> {
        match &mut self.state {
            BridgeState::Running { runtime, stream } => {
                let step =
                    panic::catch_unwind(AssertUnwindSafe(|| runtime.block_on(stream.next())));
                match step {
                    Ok(Some(event)) => {
                        if event.is_done() {
                            self.state = BridgeState::Finished;
                        }
                        Some(event)
                    }
                    // The orchestrator always ends with Done; keep the guarantee regardless.
                    Ok(None) => {
                        self.state = BridgeState::Finished;
                        Some(ScrapeEvent::Done)
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        scout_error!(
                            "scrape {}: streaming bridge failed: {message}",
                            self.scrape_id
                        );
                        self.state = bridge_failure(&message);
                        self.next()
                    }
                }
            }
            BridgeState::Draining(pending) => {
                let event = pending.pop_front();
                if pending.is_empty() {
                    self.state = BridgeState::Finished;
                }
                event
            }
            BridgeState::Finished => None,
        }
    }
}

impl Drop for ScrapeBridge {
    fn drop(&mut self) {
        self.finish_early();
    }
}

fn bridge_failure(message: &str) -> BridgeState {
    BridgeState::Draining(VecDeque::from([
        ScrapeEvent::log(format!("Error in streaming bridge: {message}")),
        ScrapeEvent::Done,
    ]))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
