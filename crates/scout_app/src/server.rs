//! HTTP front door: the embedded page and the streaming `/scrape` relay.
//!
//! Each scrape runs on its own OS thread that pulls events from a
//! [`ScrapeBridge`] and forwards their wire lines over a bounded channel.
//! When the browser goes away the response body is dropped, which cancels
//! the scrape; the thread stops pulling and dropping the bridge releases the
//! platform client.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream;
use scout_core::{ScrapeEvent, ScrapeForm, ScrapeRequest};
use scout_engine::{Orchestrator, ScrapeBridge, ScrapeId};
use scout_logging::{scout_debug, scout_error, scout_info, scout_warn};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_STREAM: &str = "text/event-stream";
const INDEX_HTML: &str = include_str!("../static/index.html");

/// Lines buffered between the scrape thread and the HTTP body.
const LINE_BUFFER: usize = 64;

struct AppState {
    orchestrator: Orchestrator,
    next_scrape_id: AtomicU64,
}

pub fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        next_scrape_id: AtomicU64::new(1),
    });
    Router::new()
        .route("/", get(index))
        .route("/scrape", post(scrape))
        .with_state(state)
}

pub async fn serve(orchestrator: Orchestrator, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("could not bind port {port}"))?;
    scout_info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(orchestrator))
        .await
        .context("server stopped unexpectedly")
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn scrape(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let scrape_id = state.next_scrape_id.fetch_add(1, Ordering::Relaxed);

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(problem) => {
            scout_warn!("scrape {scrape_id}: invalid input: {problem}");
            return event_stream(Body::from(closing_lines(&format!(
                "Invalid input: {problem}"
            ))));
        }
    };
    scout_info!(
        "scrape {scrape_id}: {} channel(s), {} keyword(s), limit {}",
        request.channels.len(),
        request.keywords.len(),
        request.limit
    );

    let cancel = CancellationToken::new();
    match spawn_scrape(state.orchestrator.clone(), scrape_id, request, cancel.clone()) {
        Ok(lines) => {
            // Dropping the body, on completion or disconnect, cancels the scrape.
            let relay = (lines, cancel.drop_guard());
            let lines = stream::unfold(relay, |(mut lines, guard)| async move {
                lines
                    .recv()
                    .await
                    .map(|line| (Ok::<_, Infallible>(line), (lines, guard)))
            });
            event_stream(Body::from_stream(lines))
        }
        Err(err) => {
            scout_error!("scrape {scrape_id}: could not start worker thread: {err}");
            event_stream(Body::from(closing_lines(&format!(
                "Error in streaming bridge: {err}"
            ))))
        }
    }
}

fn parse_request(body: &[u8]) -> Result<ScrapeRequest, String> {
    let form: ScrapeForm = serde_json::from_slice(body).map_err(|err| err.to_string())?;
    form.into_request().map_err(|err| err.to_string())
}

/// Runs the scrape on a dedicated thread; the bridge must not live on an async worker.
fn spawn_scrape(
    orchestrator: Orchestrator,
    scrape_id: ScrapeId,
    request: ScrapeRequest,
    cancel: CancellationToken,
) -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name(format!("scrape-{scrape_id}"))
        .spawn(move || {
            let bridge = ScrapeBridge::start_with_cancel(&orchestrator, scrape_id, request, cancel);
            for event in bridge {
                if tx.blocking_send(event.to_wire()).is_err() {
                    scout_info!("scrape {scrape_id}: client went away, stopping");
                    break;
                }
            }
            scout_debug!("scrape {scrape_id}: relay finished");
        })?;
    Ok(rx)
}

fn closing_lines(message: &str) -> String {
    let mut lines = ScrapeEvent::log(message).to_wire();
    lines.push_str(&ScrapeEvent::Done.to_wire());
    lines
}

fn event_stream(body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, EVENT_STREAM),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
