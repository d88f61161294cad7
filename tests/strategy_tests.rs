mod common;

use std::time::Duration;

use common::{
    count_of, flaky_worker, flaky_worker_with, flaky_worker_with_restart, oneshot_worker,
    snapshot, steady_worker, trace, wait_until, Recorder,
};
use taskwarden::{Config, EventKind, Restart, Strategy, SupervisorSpec, Warden};

#[tokio::test(start_paused = true)]
async fn one_for_one_restarts_only_the_failed_child() {
    let t = trace();
    let recorder = Recorder::new();
    let spec = SupervisorSpec::builder("root")
        .with_strategy(Strategy::OneForOne)
        .with_tolerance(3, Duration::from_secs(5))
        .with_child(flaky_worker("W1", &t, 3))
        .with_child(steady_worker("W2", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), vec![recorder.clone()]);
    let root = warden.spawn(spec).await.unwrap();

    // W1 fails three times and is restarted three times; its fourth run is
    // steady.
    wait_until(|| count_of(&t, "start W1") == 4).await;
    wait_until(|| recorder.count(EventKind::Restarted, "W1") == 3).await;

    assert_eq!(count_of(&t, "start W2"), 1);
    assert_eq!(count_of(&t, "stop W2"), 0);
    assert_eq!(recorder.count(EventKind::Restarted, "W2"), 0);

    // Still running: three failures within the window are tolerated.
    assert!(root.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn one_for_all_stops_and_restarts_every_sibling() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_strategy(Strategy::OneForAll)
        .with_tolerance(2, Duration::from_secs(5))
        .with_child(steady_worker("W1", &t))
        .with_child(flaky_worker("W2", &t, 1))
        .with_child(steady_worker("W3", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    wait_until(|| t.lock().unwrap().len() >= 8).await;
    // W2 already exited, so it is not stopped; the others stop in reverse
    // order, then everything starts again in declaration order.
    assert_eq!(
        snapshot(&t),
        vec![
            "start W1", "start W2", "start W3", // initial start order
            "stop W3", "stop W1", // reverse stop, failing child skipped
            "start W1", "start W2", "start W3", // restart in order
        ]
    );

    assert!(root.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn rest_for_one_leaves_earlier_siblings_alone() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_strategy(Strategy::RestForOne)
        .with_tolerance(2, Duration::from_secs(5))
        .with_child(steady_worker("W1", &t))
        .with_child(flaky_worker("W2", &t, 1))
        .with_child(steady_worker("W3", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    wait_until(|| t.lock().unwrap().len() >= 6).await;
    assert_eq!(
        snapshot(&t),
        vec![
            "start W1", "start W2", "start W3", // initial start order
            "stop W3", // only the later sibling stops
            "start W2", "start W3", // failed child and later siblings restart
        ]
    );
    assert_eq!(count_of(&t, "stop W1"), 0);

    assert!(root.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn transient_child_is_not_restarted_after_clean_exit() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_child(oneshot_worker("quick", &t, Restart::Transient))
        .with_child(steady_worker("W2", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    // "quick" exits cleanly right away; Transient must leave it inert.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count_of(&t, "start quick"), 1);
    assert_eq!(count_of(&t, "stop W2"), 0);
    assert!(root.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn transient_child_is_restarted_after_failure() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_tolerance(3, Duration::from_secs(5))
        .with_child(flaky_worker_with_restart("flaky", &t, 1, Restart::Transient))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    wait_until(|| count_of(&t, "start flaky") == 2).await;
    assert!(root.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn temporary_child_is_never_restarted() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_tolerance(3, Duration::from_secs(5))
        .with_child(flaky_worker_with_restart("tmp", &t, 99, Restart::Temporary))
        .with_child(steady_worker("W2", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    wait_until(|| count_of(&t, "start tmp") == 1).await;
    // Give the supervisor room to (wrongly) restart it; it must not.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(count_of(&t, "start tmp"), 1);
    assert_eq!(count_of(&t, "stop W2"), 0);

    assert!(root.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn temporary_slot_is_excluded_from_group_restarts() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_strategy(Strategy::OneForAll)
        .with_tolerance(3, Duration::from_secs(5))
        .with_child(flaky_worker_with_restart("tmp", &t, 99, Restart::Temporary))
        .with_child(flaky_worker_with(
            "W2",
            &t,
            1,
            Restart::Permanent,
            Duration::from_millis(50),
        ))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    // tmp fails first (10ms) and goes inert; W2's later failure (50ms)
    // restarts the group, which by then is W2 alone.
    wait_until(|| count_of(&t, "start W2") == 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count_of(&t, "start tmp"), 1);

    assert!(root.stop().await.is_ok());
}
