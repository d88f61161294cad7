//! # Sabotage plan database and state loop.
//!
//! [`SabotageDb`] is the client half: every operation is a request/ack
//! round-trip with the state loop over an internal command channel. The
//! loop itself runs as a supervised worker (see [`SabotageDb::node`]) and
//! owns three tables:
//!
//! - `plans`: registered plans by name
//! - `running`: stop handles of currently executing plan workers
//! - `saboteurs`: per-target failure signalers with start counts
//!
//! ## Rules
//! - Removing a running plan stops it first; if the stop fails, the plan
//!   stays registered in **both** tables and the stop error is surfaced.
//! - Stopping a plan that is registered but not running reports
//!   `PlanNotRunning` and leaves the tables untouched.
//! - Registration is per start: a restarted saboteur re-registers and
//!   re-subscribes to the same signaler, and its start count grows.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::select;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::core::{ChildHandle, Spawner};
use crate::error::{BuildError, ChildError, SupervisorError, TaskError};
use crate::sabotage::plan::Plan;
use crate::specs::{ChildSpec, Node};
use crate::tasks::StartNotifier;

/// Errors returned by sabotage-plan operations.
#[derive(Error, Debug)]
pub enum SabotageError {
    /// The named saboteur was never registered.
    #[error("invalid node name: not found")]
    NodeNotFound,
    /// A plan with this name is already registered.
    #[error("plan name already registered")]
    PlanExists,
    /// No plan with this name is registered.
    #[error("invalid plan name: not found")]
    PlanNotFound,
    /// The plan is already running.
    #[error("plan already running")]
    PlanRunning,
    /// The plan is registered but not running.
    #[error("plan is not running")]
    PlanNotRunning,
    /// The plan worker could not be spawned.
    #[error("plan could not be started")]
    Spawn(#[source] SupervisorError),
    /// The plan worker could not be stopped.
    #[error("plan could not be stopped")]
    Stop(#[source] ChildError),
    /// The plan worker spec could not be built.
    #[error("plan spec could not be built")]
    Build(#[source] BuildError),
    /// The state loop is not running.
    #[error("sabotage state loop is not running")]
    Closed,
}

/// Messages that modify the state tables.
enum Command {
    Insert {
        plan: Plan,
        respond_to: oneshot::Sender<Result<(), SabotageError>>,
    },
    Remove {
        name: String,
        respond_to: oneshot::Sender<Result<(), SabotageError>>,
    },
    Start {
        name: String,
        respond_to: oneshot::Sender<Result<(), SabotageError>>,
    },
    Stop {
        name: String,
        respond_to: oneshot::Sender<Result<(), SabotageError>>,
    },
    Register {
        subtree: String,
        respond_to: oneshot::Sender<broadcast::Receiver<String>>,
    },
    StartCount {
        subtree: String,
        respond_to: oneshot::Sender<Option<u32>>,
    },
}

/// One registered sabotage target.
struct SaboteurNode {
    start_count: u32,
    signal: broadcast::Sender<String>,
}

#[derive(Default)]
struct State {
    plans: HashMap<String, Plan>,
    running: HashMap<String, ChildHandle>,
    saboteurs: HashMap<String, SaboteurNode>,
}

/// Receiver and tables, shared with the supervised loop body so state
/// survives restarts of the loop.
struct Inner {
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state: State,
}

/// Cloneable client handle to the sabotage state loop.
#[derive(Clone)]
pub struct SabotageDb {
    cmd_tx: mpsc::UnboundedSender<Command>,
    inner: Arc<Mutex<Inner>>,
}

impl Default for SabotageDb {
    fn default() -> Self {
        Self::new()
    }
}

impl SabotageDb {
    /// Creates an empty database. Nothing processes commands until the
    /// [`node`](SabotageDb::node) worker is running somewhere in a tree.
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Self {
            cmd_tx,
            inner: Arc::new(Mutex::new(Inner {
                cmd_rx,
                state: State::default(),
            })),
        }
    }

    /// Builds the worker node running the state loop. State survives
    /// restarts: a fresh instance picks up the same tables and command
    /// receiver.
    pub fn node(&self, spawner: Arc<dyn Spawner>) -> Result<Node, BuildError> {
        let inner = Arc::clone(&self.inner);
        let spec = ChildSpec::builder("sabotage-db").build(move |ctx: CancellationToken| {
            let inner = Arc::clone(&inner);
            let spawner = Arc::clone(&spawner);
            async move {
                let mut guard = inner.lock().await;
                let Inner { cmd_rx, state } = &mut *guard;
                state_loop(ctx, cmd_rx, state, spawner).await
            }
        })?;
        Ok(Node::Worker(spec))
    }

    /// Builds a saboteur worker spec targeting `subtree`: on each start it
    /// registers with the state loop and then fails whenever a running plan
    /// signals it.
    pub fn saboteur(
        &self,
        name: impl Into<Cow<'static, str>>,
        subtree: impl Into<String>,
    ) -> Result<ChildSpec, BuildError> {
        let cmd_tx = self.cmd_tx.clone();
        let subtree = subtree.into();

        ChildSpec::builder(name).build_with_ack(
            move |ctx: CancellationToken, started: StartNotifier| {
                let cmd_tx = cmd_tx.clone();
                let subtree = subtree.clone();
                async move {
                    let (respond_to, response) = oneshot::channel();
                    let registered = cmd_tx.send(Command::Register {
                        subtree,
                        respond_to,
                    });
                    if registered.is_err() {
                        let err = TaskError::fail("sabotage state loop unavailable");
                        started.failure(err.clone());
                        return Err(err);
                    }

                    let mut signal = select! {
                        _ = ctx.cancelled() => {
                            started.failure(TaskError::Canceled);
                            return Err(TaskError::Canceled);
                        }
                        response = response => match response {
                            Ok(signal) => signal,
                            Err(_) => {
                                let err = TaskError::fail("sabotage registration dropped");
                                started.failure(err.clone());
                                return Err(err);
                            }
                        },
                    };
                    started.success();

                    loop {
                        select! {
                            _ = ctx.cancelled() => return Ok(()),
                            injected = signal.recv() => match injected {
                                Ok(reason) => return Err(TaskError::fail(reason)),
                                Err(broadcast::error::RecvError::Closed) => return Ok(()),
                                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            },
                        }
                    }
                }
            },
        )
    }

    /// Registers a sabotage plan.
    pub async fn insert_plan(
        &self,
        name: impl Into<String>,
        subtree: impl Into<String>,
        duration: Duration,
        period: Duration,
        attempts: u32,
    ) -> Result<(), SabotageError> {
        let plan = Plan {
            name: name.into(),
            subtree: subtree.into(),
            duration,
            period,
            attempts,
        };
        self.roundtrip(|respond_to| Command::Insert { plan, respond_to })
            .await
    }

    /// Removes a plan, stopping it first if it is running.
    pub async fn remove_plan(&self, name: impl Into<String>) -> Result<(), SabotageError> {
        let name = name.into();
        self.roundtrip(|respond_to| Command::Remove { name, respond_to })
            .await
    }

    /// Executes a previously registered plan.
    pub async fn start_plan(&self, name: impl Into<String>) -> Result<(), SabotageError> {
        let name = name.into();
        self.roundtrip(|respond_to| Command::Start { name, respond_to })
            .await
    }

    /// Stops a running plan.
    pub async fn stop_plan(&self, name: impl Into<String>) -> Result<(), SabotageError> {
        let name = name.into();
        self.roundtrip(|respond_to| Command::Stop { name, respond_to })
            .await
    }

    /// Returns how many times the saboteur for `subtree` has (re)started,
    /// or an error if it was never registered.
    pub async fn saboteur_starts(&self, subtree: impl Into<String>) -> Result<u32, SabotageError> {
        let (respond_to, response) = oneshot::channel();
        self.cmd_tx
            .send(Command::StartCount {
                subtree: subtree.into(),
                respond_to,
            })
            .map_err(|_| SabotageError::Closed)?;
        match response.await {
            Ok(Some(count)) => Ok(count),
            Ok(None) => Err(SabotageError::NodeNotFound),
            Err(_) => Err(SabotageError::Closed),
        }
    }

    async fn roundtrip(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<(), SabotageError>>) -> Command,
    ) -> Result<(), SabotageError> {
        let (respond_to, response) = oneshot::channel();
        self.cmd_tx
            .send(make(respond_to))
            .map_err(|_| SabotageError::Closed)?;
        response.await.map_err(|_| SabotageError::Closed)?
    }
}

/// Handles messages that modify the state tables until cancelled.
async fn state_loop(
    ctx: CancellationToken,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    state: &mut State,
    spawner: Arc<dyn Spawner>,
) -> Result<(), TaskError> {
    loop {
        let cmd = select! {
            _ = ctx.cancelled() => return Ok(()),
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => return Err(TaskError::fatal("sabotage command channel closed")),
            },
        };

        match cmd {
            Command::Insert { plan, respond_to } => {
                let result = if !state.saboteurs.contains_key(&plan.subtree) {
                    Err(SabotageError::NodeNotFound)
                } else if state.plans.contains_key(&plan.name) {
                    Err(SabotageError::PlanExists)
                } else {
                    state.plans.insert(plan.name.clone(), plan);
                    Ok(())
                };
                let _ = respond_to.send(result);
            }

            Command::Remove { name, respond_to } => {
                if !state.plans.contains_key(&name) {
                    let _ = respond_to.send(Err(SabotageError::PlanNotFound));
                    continue;
                }
                if let Some(handle) = state.running.get(&name) {
                    if let Err(err) = handle.stop().await {
                        // Stop failed: the plan stays registered in both
                        // tables.
                        let _ = respond_to.send(Err(SabotageError::Stop(err)));
                        continue;
                    }
                    state.running.remove(&name);
                }
                state.plans.remove(&name);
                let _ = respond_to.send(Ok(()));
            }

            Command::Start { name, respond_to } => {
                let Some(plan) = state.plans.get(&name) else {
                    let _ = respond_to.send(Err(SabotageError::PlanNotFound));
                    continue;
                };
                if state.running.contains_key(&name) {
                    let _ = respond_to.send(Err(SabotageError::PlanRunning));
                    continue;
                }
                let Some(saboteur) = state.saboteurs.get(&plan.subtree) else {
                    let _ = respond_to.send(Err(SabotageError::NodeNotFound));
                    continue;
                };
                let node = match plan.to_node(saboteur.signal.clone()) {
                    Ok(node) => node,
                    Err(err) => {
                        let _ = respond_to.send(Err(SabotageError::Build(err)));
                        continue;
                    }
                };
                match spawner.spawn(node).await {
                    Ok(handle) => {
                        state.running.insert(name.clone(), handle);
                        let _ = respond_to.send(Ok(()));
                    }
                    Err(err) => {
                        let _ = respond_to.send(Err(SabotageError::Spawn(err)));
                    }
                }
            }

            Command::Stop { name, respond_to } => {
                if !state.plans.contains_key(&name) {
                    let _ = respond_to.send(Err(SabotageError::PlanNotFound));
                    continue;
                }
                let Some(handle) = state.running.get(&name) else {
                    let _ = respond_to.send(Err(SabotageError::PlanNotRunning));
                    continue;
                };
                match handle.stop().await {
                    Err(err) => {
                        let _ = respond_to.send(Err(SabotageError::Stop(err)));
                    }
                    Ok(()) => {
                        state.running.remove(&name);
                        let _ = respond_to.send(Ok(()));
                    }
                }
            }

            Command::Register {
                subtree,
                respond_to,
            } => {
                let node = state
                    .saboteurs
                    .entry(subtree)
                    .or_insert_with(|| SaboteurNode {
                        start_count: 0,
                        signal: broadcast::channel(8).0,
                    });
                node.start_count += 1;
                let _ = respond_to.send(node.signal.subscribe());
            }

            Command::StartCount {
                subtree,
                respond_to,
            } => {
                let count = state.saboteurs.get(&subtree).map(|n| n.start_count);
                let _ = respond_to.send(count);
            }
        }
    }
}
