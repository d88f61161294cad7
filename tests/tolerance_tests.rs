mod common;

use std::time::Duration;

use common::{count_of, failing_worker, steady_worker, trace, wait_until, Recorder};
use taskwarden::{
    ChildSpec, Config, ErrorKvs, EventKind, Shutdown, Strategy, SupervisorSpec, SupervisorError,
    Warden,
};

#[tokio::test(start_paused = true)]
async fn tolerance_exceeded_crashes_the_supervisor() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_strategy(Strategy::OneForOne)
        .with_tolerance(3, Duration::from_secs(5))
        .with_child(failing_worker("W1", &t, Duration::from_millis(10)))
        .with_child(steady_worker("W2", &t))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    let err = root.wait().await.unwrap_err();
    let SupervisorError::Restart(restart) = &err else {
        panic!("expected a restart error, got {err:?}");
    };

    assert_eq!(restart.tolerance().node_name(), "W1");
    assert_eq!(restart.tolerance().intensity(), 3);
    assert_eq!(restart.tolerance().restarts(), 4);

    let kvs = err.kvs();
    assert_eq!(kvs.get("supervisor.name").map(String::as_str), Some("root"));
    assert_eq!(
        kvs.get("supervisor.restart.node.name").map(String::as_str),
        Some("W1")
    );
    assert_eq!(
        kvs.get("supervisor.restart.intensity").map(String::as_str),
        Some("3")
    );
    // W2 stopped cleanly during teardown, so no termination entries.
    assert!(!kvs.keys().any(|k| k.starts_with("supervisor.termination.")));

    // W1 ran 4 times (initial + 3 tolerated restarts); W2 was torn down.
    assert_eq!(count_of(&t, "start W1"), 4);
    assert_eq!(count_of(&t, "stop W2"), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_errors_are_carried_by_the_restart_error() {
    let t = trace();
    let stubborn = ChildSpec::builder("W2")
        .with_shutdown(Shutdown::Timeout(Duration::from_millis(50)))
        .build(|_ctx| std::future::pending::<Result<(), taskwarden::TaskError>>())
        .unwrap();

    let spec = SupervisorSpec::builder("root")
        .with_tolerance(0, Duration::from_secs(5))
        .with_child(failing_worker("W1", &t, Duration::from_millis(10)))
        .with_child(stubborn)
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    let err = root.wait().await.unwrap_err();
    let kvs = err.kvs();
    assert_eq!(
        kvs.get("supervisor.termination.node.0.name")
            .map(String::as_str),
        Some("W2")
    );
    assert!(
        kvs.get("supervisor.termination.node.0.error")
            .is_some_and(|e| e.contains("shutdown budget"))
    );
}

#[tokio::test(start_paused = true)]
async fn zero_intensity_escalates_on_first_restart() {
    let t = trace();
    let spec = SupervisorSpec::builder("root")
        .with_tolerance(0, Duration::from_secs(5))
        .with_child(failing_worker("W1", &t, Duration::from_millis(10)))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), Vec::new());
    let root = warden.spawn(spec).await.unwrap();

    let err = root.wait().await.unwrap_err();
    let SupervisorError::Restart(restart) = err else {
        panic!("expected a restart error");
    };
    assert_eq!(restart.tolerance().restarts(), 1);

    // The child was never restarted.
    assert_eq!(count_of(&t, "start W1"), 1);
}

#[tokio::test(start_paused = true)]
async fn restarts_outside_the_window_are_forgotten() {
    let t = trace();
    let recorder = Recorder::new();
    let spec = SupervisorSpec::builder("root")
        .with_tolerance(1, Duration::from_millis(100))
        .with_child(failing_worker("W1", &t, Duration::from_millis(200)))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), vec![recorder.clone()]);
    let root = warden.spawn(spec).await.unwrap();

    // Failures are 200ms apart while the window is 100ms wide: every
    // restart event stands alone and the supervisor keeps going.
    wait_until(|| count_of(&t, "start W1") == 4).await;
    wait_until(|| recorder.count(EventKind::Restarted, "W1") >= 3).await;

    assert!(root.stop().await.is_ok());
}
