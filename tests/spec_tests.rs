use std::time::Duration;

use taskwarden::{
    BuildError, ChildSpec, Order, Restart, Shutdown, Strategy, SupervisorSpec, TaskError,
    Tolerance,
};

fn noop_worker(name: &'static str) -> Result<ChildSpec, BuildError> {
    ChildSpec::worker(name, |_ctx| async { Ok::<_, TaskError>(()) })
}

#[test]
fn worker_defaults() {
    let spec = noop_worker("w").unwrap();
    assert_eq!(spec.name(), "w");
    assert_eq!(spec.restart(), Restart::Permanent);
    assert_eq!(spec.shutdown(), Shutdown::Timeout(Duration::from_secs(5)));
}

#[test]
fn worker_overrides() {
    let spec = ChildSpec::builder("w")
        .with_restart(Restart::Temporary)
        .with_shutdown(Shutdown::Infinity)
        .build(|_ctx| async { Ok::<_, TaskError>(()) })
        .unwrap();
    assert_eq!(spec.restart(), Restart::Temporary);
    assert_eq!(spec.shutdown(), Shutdown::Infinity);
}

#[test]
fn empty_name_is_rejected() {
    let err = noop_worker("").unwrap_err();
    assert!(matches!(err, BuildError::EmptyName));
}

#[test]
fn path_separator_in_name_is_rejected() {
    let err = ChildSpec::worker("a/b", |_ctx| async { Ok::<_, TaskError>(()) }).unwrap_err();
    assert!(matches!(err, BuildError::ReservedName { name } if name == "a/b"));
}

#[test]
fn supervisor_defaults() {
    let spec = SupervisorSpec::builder("root").build().unwrap();
    assert_eq!(spec.strategy(), Strategy::OneForOne);
    assert_eq!(spec.order(), Order::LeftToRight);
    assert_eq!(spec.restart(), Restart::Permanent);
    assert_eq!(spec.shutdown(), Shutdown::Infinity);
    assert_eq!(
        spec.tolerance(),
        Tolerance {
            intensity: 1,
            period: Duration::from_secs(5)
        }
    );
}

#[test]
fn zero_period_is_rejected() {
    let err = SupervisorSpec::builder("root")
        .with_tolerance(3, Duration::ZERO)
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::ZeroPeriod { name } if name == "root"));
}

#[test]
fn duplicate_sibling_names_are_rejected() {
    let err = SupervisorSpec::builder("root")
        .with_child(noop_worker("w").unwrap())
        .with_child(noop_worker("w").unwrap())
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { name } if name == "w"));
}

#[test]
fn supervisor_name_validation_applies() {
    let err = SupervisorSpec::builder("a/b").build().unwrap_err();
    assert!(matches!(err, BuildError::ReservedName { .. }));
}
