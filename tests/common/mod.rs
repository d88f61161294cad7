#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use taskwarden::{ChildSpec, Event, EventKind, Restart, Subscribe, TaskError};

/// Shared ordered log of observable effects (starts, stops) written by
/// worker bodies.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

pub fn count_of(trace: &Trace, entry: &str) -> usize {
    trace.lock().unwrap().iter().filter(|e| *e == entry).count()
}

/// Event subscriber that records everything for later assertions.
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind, node: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind && e.node.as_deref() == Some(node))
            .count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// Polls `cond` until it holds, advancing (paused) time in small steps.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..4000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Worker that logs its start, runs until cancelled, and logs the stop.
pub fn steady_worker(name: &'static str, trace: &Trace) -> ChildSpec {
    let trace = trace.clone();
    ChildSpec::worker(name, move |ctx| {
        let trace = trace.clone();
        async move {
            trace.lock().unwrap().push(format!("start {name}"));
            ctx.cancelled().await;
            trace.lock().unwrap().push(format!("stop {name}"));
            Ok(())
        }
    })
    .expect("valid worker spec")
}

/// Worker that fails (after a short beat) on its first `failures` runs,
/// then behaves like a steady worker.
pub fn flaky_worker(name: &'static str, trace: &Trace, failures: u32) -> ChildSpec {
    flaky_worker_with(
        name,
        trace,
        failures,
        Restart::Permanent,
        Duration::from_millis(10),
    )
}

pub fn flaky_worker_with_restart(
    name: &'static str,
    trace: &Trace,
    failures: u32,
    restart: Restart,
) -> ChildSpec {
    flaky_worker_with(name, trace, failures, restart, Duration::from_millis(10))
}

pub fn flaky_worker_with(
    name: &'static str,
    trace: &Trace,
    failures: u32,
    restart: Restart,
    beat: Duration,
) -> ChildSpec {
    let trace = trace.clone();
    let runs = Arc::new(AtomicU32::new(0));
    ChildSpec::builder(name)
        .with_restart(restart)
        .build(move |ctx| {
            let trace = trace.clone();
            let runs = runs.clone();
            async move {
                trace.lock().unwrap().push(format!("start {name}"));
                if runs.fetch_add(1, Ordering::SeqCst) < failures {
                    tokio::time::sleep(beat).await;
                    return Err(TaskError::fail("boom"));
                }
                ctx.cancelled().await;
                trace.lock().unwrap().push(format!("stop {name}"));
                Ok(())
            }
        })
        .expect("valid worker spec")
}

/// Worker that logs its start and exits cleanly right away.
pub fn oneshot_worker(name: &'static str, trace: &Trace, restart: Restart) -> ChildSpec {
    let trace = trace.clone();
    ChildSpec::builder(name)
        .with_restart(restart)
        .build(move |_ctx| {
            let trace = trace.clone();
            async move {
                trace.lock().unwrap().push(format!("start {name}"));
                Ok(())
            }
        })
        .expect("valid worker spec")
}

/// Worker that fails on every run, with a configurable delay between start
/// and failure. Exits cleanly if cancelled before the failure lands.
pub fn failing_worker(name: &'static str, trace: &Trace, beat: Duration) -> ChildSpec {
    let trace = trace.clone();
    ChildSpec::worker(name, move |ctx| {
        let trace = trace.clone();
        async move {
            trace.lock().unwrap().push(format!("start {name}"));
            tokio::select! {
                _ = tokio::time::sleep(beat) => Err(TaskError::fail("boom")),
                _ = ctx.cancelled() => Ok(()),
            }
        }
    })
    .expect("valid worker spec")
}

/// Worker whose start acknowledgement always reports a failure.
pub fn start_fail_worker(name: &'static str) -> ChildSpec {
    ChildSpec::builder(name)
        .build_with_ack(|_ctx, started| async move {
            let err = TaskError::fail("no resources");
            started.failure(err.clone());
            Err(err)
        })
        .expect("valid worker spec")
}
