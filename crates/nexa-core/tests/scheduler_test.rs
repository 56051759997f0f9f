#![allow(clippy::unwrap_used)]
// Poll loop behavior of `PollingScheduler`, on paused time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{FakeProvider, Published, RecordingSink, status_of};
use nexa_core::{PollCategory, PollIntervals, PollingScheduler};

fn intervals() -> PollIntervals {
    PollIntervals {
        status: Duration::from_secs(30),
        battery: Duration::from_secs(180),
        parameter: Duration::from_secs(180),
    }
}

fn setup(provider: FakeProvider) -> (PollingScheduler, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let scheduler = PollingScheduler::new(Arc::new(provider), sink.clone(), intervals());
    (scheduler, sink)
}

// ── Startup ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_first_tick_fires_immediately_for_every_category() {
    let provider = FakeProvider::with_devices(&["A", "B"]);
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let events = sink.events();
    for serial in ["A", "B"] {
        assert!(events.iter().any(|e| matches!(e, Published::Status(s, _) if s == serial)));
        assert!(events.iter().any(|e| matches!(e, Published::Batteries(s, _) if s == serial)));
        assert!(events.iter().any(|e| matches!(e, Published::Parameters(s, _) if s == serial)));
    }
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_devices_visited_in_enumeration_order() {
    let provider = FakeProvider::with_devices(&["C", "A", "B"]);
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    scheduler.stop().await;

    let order: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Published::Status(s, _) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(order, vec!["C", "A", "B"]);
}

// ── Isolation ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_failing_device_does_not_block_others() {
    let mut provider = FakeProvider::with_devices(&["A", "B", "C"]);
    provider.failing.insert("B".into());
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_secs(31)).await;
    scheduler.stop().await;

    assert_eq!(sink.statuses_for("A").len(), 2);
    assert!(sink.statuses_for("B").is_empty());
    assert_eq!(sink.statuses_for("C").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_loops_run_on_independent_cadences() {
    let provider = FakeProvider::with_devices(&["A"]);
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_secs(95)).await;
    scheduler.stop().await;

    let events = sink.events();
    let batteries = events
        .iter()
        .filter(|e| matches!(e, Published::Batteries(..)))
        .count();
    // Ticks at 0, 30, 60 and 90 seconds.
    assert_eq!(sink.statuses_for("A").len(), 4);
    assert_eq!(batteries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_state_republishes_identical_payloads() {
    let provider = FakeProvider::with_devices(&["A"]);
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_secs(61)).await;
    scheduler.stop().await;

    let statuses = sink.statuses_for("A");
    assert_eq!(statuses.len(), 3);
    assert!(statuses.iter().all(|s| *s == status_of("A")));
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_stop_ends_all_loops() {
    let provider = FakeProvider::with_devices(&["A"]);
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(scheduler.is_running().await);

    scheduler.stop().await;
    assert!(!scheduler.is_running().await);

    let before = sink.events().len();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(sink.events().len(), before);

    // Stopping twice is harmless.
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_in_flight_fetch_publish() {
    let provider = FakeProvider {
        status_delay: Duration::from_secs(3),
        ..FakeProvider::with_devices(&["A", "B"])
    };
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sink.statuses_for("A").is_empty());

    scheduler.stop().await;

    // A's fetch was on the wire and still lands; B is never visited.
    assert_eq!(sink.statuses_for("A").len(), 1);
    assert!(sink.statuses_for("B").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_now_polls_single_device() {
    let provider = FakeProvider::with_devices(&["A", "B"]);
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.start(devices.clone()).await;
    scheduler.stop().await;
    let before_a = sink.statuses_for("A").len();
    let before_b = sink.statuses_for("B").len();

    scheduler.poll_now(PollCategory::Status, &devices[0]).await;
    assert_eq!(sink.statuses_for("A").len(), before_a + 1);
    assert_eq!(sink.statuses_for("B").len(), before_b);
    assert_eq!(scheduler.devices().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_now_failure_publishes_nothing() {
    let mut provider = FakeProvider::with_devices(&["A"]);
    provider.failing.insert("A".into());
    let devices = provider.devices.clone();
    let (scheduler, sink) = setup(provider);

    scheduler.poll_now(PollCategory::Parameter, &devices[0]).await;
    assert!(sink.parameters().is_empty());
}
