mod support;

use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use scout_core::{ScrapeEvent, ScrapeRequest};
use scout_engine::{
    ClientError, ClientFactory, Orchestrator, ScoutConfig, ScrapeBridge, SearchClient,
};
use support::{data, lines, logs, message, session_config, FakeFactory, Script};
use tokio_util::sync::CancellationToken;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

fn script() -> Script {
    Script::default()
        .with_channel("chA", 1)
        .with_channel("chB", 2)
        .with_search("chA", "x", vec![message(1, Some("one")), message(2, Some("two"))])
        .with_search("chB", "x", vec![message(3, Some("three"))])
}

fn orchestrator(config: ScoutConfig, factory: impl ClientFactory + 'static) -> Orchestrator {
    Orchestrator::new(Arc::new(config), Arc::new(factory))
}

fn request() -> ScrapeRequest {
    ScrapeRequest::new(lines("chA\nchB"), lines("x\ny"), 100)
}

struct PanickingFactory;

impl ClientFactory for PanickingFactory {
    fn create(&self, _config: &ScoutConfig) -> Result<Box<dyn SearchClient>, ClientError> {
        panic!("factory exploded");
    }
}

#[test]
fn yields_every_event_then_stops() {
    init_logging();
    let (_temp, config) = session_config();
    let factory = FakeFactory::new(script());
    let orchestrator = orchestrator(config, factory.clone());

    let mut bridge = ScrapeBridge::start(&orchestrator, 1, request());
    let events: Vec<_> = bridge.by_ref().collect();

    assert_eq!(data(&events).len(), 3);
    assert_eq!(events.last(), Some(&ScrapeEvent::Done));
    assert_eq!(events.iter().filter(|e| e.is_done()).count(), 1);
    assert_eq!(bridge.next(), None);
    assert_eq!(bridge.scrape_id(), 1);
    drop(bridge);
    assert_eq!(factory.journal().disconnects, 1);
}

#[test]
fn abandoning_the_bridge_releases_the_client() {
    init_logging();
    let (_temp, config) = session_config();
    let factory = FakeFactory::new(script());
    let orchestrator = orchestrator(config, factory.clone());

    let mut bridge = ScrapeBridge::start(&orchestrator, 2, request());
    let first: Vec<_> = bridge.by_ref().take(4).collect();
    assert_eq!(first[0], ScrapeEvent::log("Initializing Telegram client..."));
    drop(bridge);

    let journal = factory.journal();
    assert_eq!(journal.connects, 1);
    assert_eq!(journal.disconnects, 1);
    assert!(journal.searches.len() < 4);
}

#[test]
fn dropping_during_a_flood_wait_does_not_sleep_it_out() {
    init_logging();
    let (_temp, config) = session_config();
    let factory = FakeFactory::new(
        script().with_search_error("chA", "x", ClientError::FloodWait { seconds: 3600 }),
    );
    let orchestrator = orchestrator(config, factory.clone());

    let mut bridge = ScrapeBridge::start(&orchestrator, 3, request());
    let flood = bridge
        .by_ref()
        .find(|event| *event == ScrapeEvent::log("Flood wait error. Sleeping for 3600 seconds."));
    assert!(flood.is_some());

    let started = Instant::now();
    drop(bridge);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(factory.journal().disconnects, 1);
}

#[test]
fn external_cancel_interrupts_a_blocked_next() {
    init_logging();
    let (_temp, config) = session_config();
    let factory = FakeFactory::new(
        script().with_search_error("chA", "x", ClientError::FloodWait { seconds: 3600 }),
    );
    let orchestrator = orchestrator(config, factory.clone());
    let cancel = CancellationToken::new();

    let mut bridge = ScrapeBridge::start_with_cancel(&orchestrator, 5, request(), cancel.clone());
    assert!(bridge
        .by_ref()
        .any(|event| event == ScrapeEvent::log("Flood wait error. Sleeping for 3600 seconds.")));

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
    });
    let started = Instant::now();
    let rest: Vec<_> = bridge.by_ref().collect();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(
        logs(&rest),
        vec!["Scrape cancelled.", "Client disconnected. Scrape finished."]
    );
    assert_eq!(rest.last(), Some(&ScrapeEvent::Done));
    assert_eq!(factory.journal().disconnects, 1);
}

#[test]
fn panics_surface_as_a_bridge_error_and_done() {
    init_logging();
    let (_temp, config) = session_config();
    let orchestrator = orchestrator(config, PanickingFactory);

    let events: Vec<_> = ScrapeBridge::start(&orchestrator, 4, request()).collect();

    assert_eq!(
        events,
        vec![
            ScrapeEvent::log("Initializing Telegram client..."),
            ScrapeEvent::log("Error in streaming bridge: factory exploded"),
            ScrapeEvent::Done,
        ]
    );
}

#[test]
fn concurrent_scrapes_are_independent() {
    init_logging();
    let (_temp, config) = session_config();
    let factory = FakeFactory::new(script());
    let orchestrator = orchestrator(config, factory.clone());

    let workers: Vec<_> = (0..4)
        .map(|scrape_id| {
            let orchestrator = orchestrator.clone();
            thread::spawn(move || {
                ScrapeBridge::start(&orchestrator, scrape_id, request()).collect::<Vec<_>>()
            })
        })
        .collect();

    for worker in workers {
        let events = worker.join().unwrap();
        assert_eq!(data(&events).len(), 3);
        assert!(logs(&events).contains(&"Found a total of 3 messages."));
        assert_eq!(events.last(), Some(&ScrapeEvent::Done));
    }
    let journal = factory.journal();
    assert_eq!(journal.created, 4);
    assert_eq!(journal.disconnects, 4);
}
