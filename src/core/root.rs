//! # Root facade: spawning and stopping whole trees.
//!
//! [`Warden`] owns the runtime plumbing shared by the trees it spawns (event
//! bus, subscriber fan-out) and nothing else: two trees spawned from the
//! same warden share no supervision state, and concurrent `spawn` calls are
//! independent.
//!
//! [`RootHandle`] is the stop handle for one spawned tree:
//! - [`stop`](RootHandle::stop) cancels the root and blocks until the whole
//!   tree has terminated, returning the aggregated error (`Ok` if clean)
//! - [`wait`](RootHandle::wait) observes the tree ending on its own
//!   (tolerance escalation at the root)
//! - [`run_until_signal`](RootHandle::run_until_signal) ties the tree to OS
//!   termination signals
//! - [`spawner`](RootHandle::spawner) yields a [`SupervisorHandle`] for
//!   inserting dynamic children under the root

use std::sync::Arc;

use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::handle::{SupervisorCommand, SupervisorHandle};
use crate::core::supervisor::SupervisorRuntime;
use crate::error::{ChildError, StartError, SupervisorError, TerminationError};
use crate::events::{Bus, Event, EventKind};
use crate::specs::SupervisorSpec;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::StartNotifier;

/// Owns the event bus and subscriber fan-out; spawns supervision trees.
pub struct Warden {
    bus: Bus,
    subs: Arc<SubscriberSet>,
}

impl Warden {
    /// Creates a new warden with the given config and subscribers (maybe
    /// empty).
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        // Pump before any tree starts so early events are not missed.
        Arc::clone(&subs).spawn_listener(bus.subscribe());
        Self { bus, subs }
    }

    /// Spawns a supervision tree from `spec`.
    ///
    /// Resolves once every descendant has started and acknowledged start —
    /// or with the start error after a full rollback. Safe to call
    /// concurrently with unrelated spawns.
    pub async fn spawn(&self, spec: SupervisorSpec) -> Result<RootHandle, SupervisorError> {
        let runtime_name = spec.name().to_string();
        let token = CancellationToken::new();
        let runtime = SupervisorRuntime::new(
            spec,
            runtime_name.clone(),
            token.clone(),
            self.bus.clone(),
        );
        let cmd_tx = runtime.command_sender();
        let (ack_tx, ack_rx) = oneshot::channel();

        let join = tokio::spawn({
            let bus = self.bus.clone();
            let name = runtime_name.clone();
            async move {
                let result = runtime.run(StartNotifier::new(ack_tx)).await;
                match &result {
                    Ok(()) => bus.publish(
                        Event::now(EventKind::Terminated)
                            .with_node(&name)
                            .with_runtime_name(&name),
                    ),
                    Err(err) => bus.publish(
                        Event::now(EventKind::Failed)
                            .with_node(&name)
                            .with_runtime_name(&name)
                            .with_error(err.to_string()),
                    ),
                }
                result
            }
        });

        match ack_rx.await {
            Ok(Ok(())) => {
                self.bus.publish(
                    Event::now(EventKind::Started)
                        .with_node(&runtime_name)
                        .with_runtime_name(&runtime_name),
                );
                Ok(RootHandle {
                    runtime_name,
                    token,
                    join,
                    cmd_tx,
                    bus: self.bus.clone(),
                })
            }
            Ok(Err(err)) => Err(unwrap_root_failure(err, runtime_name)),
            Err(_) => Err(SupervisorError::Termination(TerminationError::panicked(
                runtime_name,
            ))),
        }
    }

    /// Total events dropped by the delivery layer so far.
    pub fn dropped_events(&self) -> u64 {
        self.subs.dropped()
    }
}

/// The root runtime reports start failures in child form; unwrap back to
/// the supervisor error it carries.
fn unwrap_root_failure(err: ChildError, runtime_name: String) -> SupervisorError {
    match err {
        ChildError::Subtree(e) => *e,
        other => SupervisorError::Start(StartError {
            runtime_name: runtime_name.clone(),
            node_name: runtime_name,
            cause: other,
            termination: None,
        }),
    }
}

/// Stop handle for one running supervision tree.
#[derive(Debug)]
pub struct RootHandle {
    runtime_name: String,
    token: CancellationToken,
    join: JoinHandle<Result<(), SupervisorError>>,
    cmd_tx: mpsc::UnboundedSender<SupervisorCommand>,
    bus: Bus,
}

impl RootHandle {
    /// Path-qualified name of the root supervisor.
    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    /// Returns a handle for inserting dynamic children under the root
    /// supervisor.
    pub fn spawner(&self) -> SupervisorHandle {
        SupervisorHandle::new(self.runtime_name.clone(), self.cmd_tx.clone())
    }

    /// Cancels the root and blocks until the whole tree has terminated.
    ///
    /// Returns `Ok(())` on a clean shutdown, or the aggregated termination
    /// error whose structured projection contains the path-qualified cause
    /// chain.
    pub async fn stop(self) -> Result<(), SupervisorError> {
        self.token.cancel();
        let name = self.runtime_name;
        flatten(self.join.await, name)
    }

    /// Blocks until the tree terminates on its own (e.g. the root's restart
    /// tolerance escalates).
    pub async fn wait(self) -> Result<(), SupervisorError> {
        let name = self.runtime_name;
        flatten(self.join.await, name)
    }

    /// Runs the tree until an OS termination signal arrives (or the tree
    /// ends on its own), then stops it.
    pub async fn run_until_signal(mut self) -> Result<(), SupervisorError> {
        select! {
            _ = wait_for_shutdown_signal() => {}
            result = &mut self.join => {
                return flatten(result, self.runtime_name.clone());
            }
        }

        self.bus.publish(Event::now(EventKind::ShutdownRequested));
        self.stop().await
    }
}

fn flatten(
    result: Result<Result<(), SupervisorError>, tokio::task::JoinError>,
    runtime_name: String,
) -> Result<(), SupervisorError> {
    match result {
        Ok(inner) => inner,
        Err(_join) => Err(SupervisorError::Termination(TerminationError::panicked(
            runtime_name,
        ))),
    }
}

/// Waits for a termination signal.
///
/// Unix: SIGINT, SIGTERM, SIGQUIT. Elsewhere: ctrl-c.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
