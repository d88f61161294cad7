mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{wait_until, Recorder};
use taskwarden::sabotage::{SabotageDb, SabotageError};
use taskwarden::{Config, EventKind, Spawner, SupervisorSpec, Warden};

async fn harness(db: &SabotageDb, recorder: Arc<Recorder>) -> taskwarden::RootHandle {
    let spec = SupervisorSpec::builder("root")
        // Injected failures are frequent; keep each restart event alone in
        // a narrow window so the tree survives the whole plan.
        .with_tolerance(1, Duration::from_millis(10))
        .build()
        .unwrap();

    let warden = Warden::new(Config::default(), vec![recorder]);
    let root = warden.spawn(spec).await.unwrap();

    let spawner: Arc<dyn Spawner> = Arc::new(root.spawner());
    spawner
        .spawn(db.node(Arc::clone(&spawner)).unwrap())
        .await
        .unwrap();
    spawner
        .spawn(db.saboteur("victim", "victim").unwrap().into())
        .await
        .unwrap();

    root
}

#[tokio::test(start_paused = true)]
async fn plans_inject_failures_into_registered_saboteurs() {
    let recorder = Recorder::new();
    let db = SabotageDb::new();
    let root = harness(&db, recorder.clone()).await;

    db.insert_plan(
        "p1",
        "victim",
        Duration::ZERO,
        Duration::from_millis(50),
        2,
    )
    .await
    .unwrap();
    db.start_plan("p1").await.unwrap();

    // Two injections, each making the victim fail and restart.
    wait_until(|| recorder.count(EventKind::Failed, "victim") >= 2).await;
    wait_until(|| recorder.count(EventKind::Restarted, "victim") >= 2).await;

    // Each restart re-registered the saboteur.
    assert!(db.saboteur_starts("victim").await.unwrap() >= 3);
    assert!(matches!(
        db.saboteur_starts("ghost").await.unwrap_err(),
        SabotageError::NodeNotFound
    ));

    root.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn plan_table_invariants_hold() {
    let recorder = Recorder::new();
    let db = SabotageDb::new();
    let root = harness(&db, recorder.clone()).await;

    // Plans require a registered target.
    let err = db
        .insert_plan("px", "ghost", Duration::ZERO, Duration::from_millis(10), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, SabotageError::NodeNotFound));

    db.insert_plan(
        "p1",
        "victim",
        Duration::ZERO,
        Duration::from_millis(20),
        1,
    )
    .await
    .unwrap();

    // Names are unique.
    let err = db
        .insert_plan("p1", "victim", Duration::ZERO, Duration::from_millis(20), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, SabotageError::PlanExists));

    // Stopping a plan that was never started is reported, not ignored.
    let err = db.stop_plan("p1").await.unwrap_err();
    assert!(matches!(err, SabotageError::PlanNotRunning));

    // Start, let it finish, stop it (idempotent on the finished worker),
    // and start it again.
    db.start_plan("p1").await.unwrap();
    wait_until(|| recorder.count(EventKind::Failed, "victim") >= 1).await;
    db.stop_plan("p1").await.unwrap();
    db.start_plan("p1").await.unwrap();
    db.stop_plan("p1").await.unwrap();

    // Removal drops both tables; unknown names are reported.
    db.remove_plan("p1").await.unwrap();
    let err = db.remove_plan("p1").await.unwrap_err();
    assert!(matches!(err, SabotageError::PlanNotFound));
    let err = db.stop_plan("p1").await.unwrap_err();
    assert!(matches!(err, SabotageError::PlanNotFound));

    root.stop().await.unwrap();
}
