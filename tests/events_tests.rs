mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{steady_worker, trace, wait_until, Recorder};
use taskwarden::{Bus, Config, Event, EventKind, Subscribe, SubscriberSet, SupervisorSpec, Warden};

/// Subscriber whose worker never drains its queue.
struct Stuck;

#[async_trait]
impl Subscribe for Stuck {
    async fn on_event(&self, _event: &Event) {
        std::future::pending::<()>().await;
    }

    fn name(&self) -> &'static str {
        "stuck"
    }

    fn queue_capacity(&self) -> usize {
        1
    }
}

#[tokio::test]
async fn slow_subscribers_lose_events_without_blocking_the_publisher() {
    let bus = Bus::new(64);
    let set = SubscriberSet::new(vec![Arc::new(Stuck)], bus.clone());

    // The worker task has not run yet on this single-threaded runtime, so
    // everything past the queue capacity is dropped on the spot — and
    // emit() never blocks.
    for _ in 0..100 {
        set.emit(&Event::now(EventKind::Started).with_node("w"));
    }

    assert!(set.dropped() > 0);
    // The stuck worker never drains; dropping the set closes its queue
    // instead of joining it.
    drop(set);
}

#[tokio::test(start_paused = true)]
async fn event_sequence_numbers_are_monotonic() {
    let t = trace();
    let recorder = Recorder::new();
    let spec = SupervisorSpec::builder("root")
        .with_child(steady_worker("W1", &t))
        .with_child(steady_worker("W2", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), vec![recorder.clone()]);
    let root = warden.spawn(spec).await.unwrap();
    root.stop().await.unwrap();

    wait_until(|| recorder.count(EventKind::Terminated, "root") >= 1).await;

    let events = recorder.events();
    assert!(events.len() >= 6, "expected a full lifecycle, got {}", events.len());
    for pair in events.windows(2) {
        assert!(pair[0].seq < pair[1].seq);
    }
}

#[tokio::test(start_paused = true)]
async fn events_carry_path_qualified_runtime_names() {
    let t = trace();
    let recorder = Recorder::new();
    let sub = SupervisorSpec::builder("sub")
        .with_child(steady_worker("W1", &t))
        .build()
        .unwrap();
    let spec = SupervisorSpec::builder("root")
        .with_child(sub)
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), vec![recorder.clone()]);
    let root = warden.spawn(spec).await.unwrap();

    wait_until(|| recorder.count(EventKind::Started, "W1") >= 1).await;
    let events = recorder.events();
    let started = events
        .iter()
        .find(|e| e.kind == EventKind::Started && e.node.as_deref() == Some("W1"))
        .unwrap();
    assert_eq!(started.runtime_name.as_deref(), Some("root/sub/W1"));

    root.stop().await.unwrap();
}
