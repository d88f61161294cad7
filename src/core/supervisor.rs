//! # Supervisor state machine.
//!
//! One [`SupervisorRuntime`] instance is the live incarnation of one
//! [`SupervisorSpec`]: a single tokio task that owns its children and
//! serializes every mutation by consuming messages from its inbound
//! channels. There is no shared mutable state between sibling supervisors.
//!
//! ## States
//! ```text
//! Starting ──► Running ──► Restarting ──► Running
//!    │            │             │
//!    │            │             └─ tolerance surpassed ─► Terminating
//!    │            └─ cancellation ─────────────────────► Terminating
//!    └─ start failure (rollback) ──► Terminated            │
//!                                                          ▼
//!                                                      Terminated
//! ```
//!
//! ## Rules
//! - Children start **strictly sequentially** in start order; a child's
//!   start acknowledgement happens-before the next sibling's spawn.
//! - Stop order is the reverse of start order, during both failure recovery
//!   and terminal teardown, each child honoring its shutdown policy.
//! - A partial start is rolled back: on any start failure the
//!   already-started siblings are stopped again in reverse order and the
//!   supervisor reports a start error. Same for cancellation mid-start.
//! - A failing child's notification is processed before any later
//!   notification on the same supervisor (single inbound channel).
//! - Restart events are accounted in a sliding window; surpassing the
//!   tolerance tears the remaining children down and escalates a restart
//!   error to the parent.
//! - Stop errors are collected, never fatal in isolation.
//!
//! ## Event data-plane
//! The supervisor publishes `Started` / `Terminated` / `Restarted` /
//! `Failed` for its **direct children**; the root facade publishes the same
//! for the root node itself. Publication is a non-blocking broadcast send,
//! so it completes before the surrounding state transition does.

use std::collections::{BTreeMap, HashSet};

use futures::future::BoxFuture;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::child::{self, PendingChild};
use crate::core::handle::SupervisorCommand;
use crate::core::notification::ChildNotification;
use crate::core::window::RestartWindow;
use crate::error::{
    BuildError, ChildError, RestartError, StartError, SupervisorError, TaskError,
    TerminationError, ToleranceExceeded,
};
use crate::events::{Bus, Event, EventKind};
use crate::specs::{ChildrenSource, Node, Order, Restart, Strategy, SupervisorSpec};
use crate::tasks::StartNotifier;

/// One child position in the supervisor's ordered child list.
struct Slot {
    node: Node,
    /// Live instance, if the slot is currently running.
    runtime: Option<child::ChildRuntime>,
    /// Incremented on every spawn of this slot; stamps notifications.
    generation: u64,
    /// Successful restarts of this slot.
    restart_count: u32,
    /// An inert slot finished for good (Temporary, or Transient after a
    /// clean exit) and is excluded from group restarts.
    inert: bool,
}

impl Slot {
    fn new(node: Node) -> Self {
        Self {
            node,
            runtime: None,
            generation: 0,
            restart_count: 0,
            inert: false,
        }
    }
}

/// Outcome of handling one inbound message.
enum Flow {
    /// Keep supervising.
    Continue,
    /// Tear the tree down (cancellation observed); report termination
    /// errors if any.
    Shutdown,
    /// The supervisor itself failed; the tree is already torn down.
    Escalate(SupervisorError),
}

/// Why starting one child did not succeed.
enum StartFailure {
    /// The supervisor's own cancellation fired while awaiting the ack.
    Cancelled { node_name: String },
    /// The child reported a start failure or violated the ack protocol.
    Failed { node_name: String, cause: ChildError },
}

/// The live state machine behind one supervisor node.
pub(crate) struct SupervisorRuntime {
    spec: SupervisorSpec,
    runtime_name: String,
    token: CancellationToken,
    bus: Bus,
    notify_tx: mpsc::UnboundedSender<ChildNotification>,
    notify_rx: mpsc::UnboundedReceiver<ChildNotification>,
    cmd_tx: mpsc::UnboundedSender<SupervisorCommand>,
    cmd_rx: mpsc::UnboundedReceiver<SupervisorCommand>,
    slots: Vec<Slot>,
    window: RestartWindow,
}

impl SupervisorRuntime {
    pub(crate) fn new(
        spec: SupervisorSpec,
        runtime_name: String,
        token: CancellationToken,
        bus: Bus,
    ) -> Self {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let window = RestartWindow::new(spec.tolerance());
        Self {
            spec,
            runtime_name,
            token,
            bus,
            notify_tx,
            notify_rx,
            cmd_tx,
            cmd_rx,
            slots: Vec::new(),
            window,
        }
    }

    pub(crate) fn command_sender(&self) -> mpsc::UnboundedSender<SupervisorCommand> {
        self.cmd_tx.clone()
    }

    /// Runs the supervisor to completion.
    ///
    /// Boxed because supervisors nest: a subtree child's body is its own
    /// `run` future.
    pub(crate) fn run(
        self,
        started: StartNotifier,
    ) -> BoxFuture<'static, Result<(), SupervisorError>> {
        Box::pin(self.run_inner(started))
    }

    async fn run_inner(mut self, started: StartNotifier) -> Result<(), SupervisorError> {
        if let Err(err) = self.start_children().await {
            started.fail_child(ChildError::Subtree(Box::new(err.clone())));
            return Err(err);
        }

        if let Some(hook) = self.spec.on_start() {
            hook.as_ref()(&self.runtime_name);
        }
        started.success();

        self.supervise().await
    }

    // ---------------------------
    // Starting
    // ---------------------------

    /// Builds the child list and starts every child in start order, each
    /// awaiting its acknowledgement. Any failure rolls back the started
    /// siblings in reverse order.
    async fn start_children(&mut self) -> Result<(), SupervisorError> {
        let nodes = self.build_nodes()?;
        self.slots = nodes.into_iter().map(Slot::new).collect();

        for idx in self.spec.order().start_indices(self.slots.len()) {
            let failure = match self.start_child(idx).await {
                Ok(()) => continue,
                Err(failure) => failure,
            };
            let (node_name, cause) = match failure {
                StartFailure::Cancelled { node_name } => {
                    (node_name, ChildError::Task(TaskError::Canceled))
                }
                StartFailure::Failed { node_name, cause } => (node_name, cause),
            };
            let termination = self.terminate_children(false).await;
            return Err(SupervisorError::Start(StartError {
                runtime_name: self.runtime_name.clone(),
                node_name,
                cause,
                termination,
            }));
        }
        Ok(())
    }

    /// Resolves the children source. Build-function failures mean the
    /// supervisor never enters its running phase.
    fn build_nodes(&self) -> Result<Vec<Node>, SupervisorError> {
        let nodes = match self.spec.children() {
            ChildrenSource::Static(nodes) => nodes.clone(),
            ChildrenSource::Build(f) => f.as_ref()().map_err(|cause| BuildError::Nodes {
                runtime_name: self.runtime_name.clone(),
                cause,
            })?,
        };

        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.name().to_string()) {
                return Err(SupervisorError::Build(BuildError::DuplicateName {
                    name: node.name().to_string(),
                }));
            }
        }
        Ok(nodes)
    }

    /// Spawns one slot's instance and synchronously awaits its start
    /// acknowledgement, so start ordering is observable.
    async fn start_child(&mut self, idx: usize) -> Result<(), StartFailure> {
        let pending = {
            let slot = &mut self.slots[idx];
            slot.generation += 1;
            child::spawn(
                &slot.node,
                &self.runtime_name,
                &self.bus,
                &self.notify_tx,
                slot.generation,
            )
        };
        let node_name = self.slots[idx].node.name().to_string();
        let PendingChild { runtime, ack } = pending;

        select! {
            ack_result = ack => match ack_result {
                Ok(Ok(())) => {
                    self.bus.publish(
                        Event::now(EventKind::Started)
                            .with_node(&node_name)
                            .with_runtime_name(runtime.runtime_name()),
                    );
                    self.slots[idx].runtime = Some(runtime);
                    Ok(())
                }
                Ok(Err(cause)) => {
                    runtime.cancel();
                    Err(StartFailure::Failed { node_name, cause })
                }
                Err(_dropped) => {
                    // The instance dropped its notifier without acking; it
                    // may still be running, so cancel it before walking
                    // away.
                    runtime.cancel();
                    Err(StartFailure::Failed {
                        node_name,
                        cause: ChildError::ReturnedBeforeAck,
                    })
                }
            },
            _ = self.token.cancelled() => {
                // Abort the start: stop the half-started instance under its
                // own budget, then let the caller roll back.
                let shutdown = self.slots[idx].node.shutdown();
                let _ = runtime.stop(shutdown).await;
                Err(StartFailure::Cancelled { node_name })
            }
        }
    }

    // ---------------------------
    // Running
    // ---------------------------

    /// The single-consumer loop: child notifications, management commands,
    /// and cancellation, serialized.
    async fn supervise(&mut self) -> Result<(), SupervisorError> {
        enum Inbound {
            Cancelled,
            Note(ChildNotification),
            Cmd(SupervisorCommand),
        }

        loop {
            let inbound = select! {
                _ = self.token.cancelled() => Inbound::Cancelled,
                Some(note) = self.notify_rx.recv() => Inbound::Note(note),
                Some(cmd) = self.cmd_rx.recv() => Inbound::Cmd(cmd),
            };

            let flow = match inbound {
                Inbound::Cancelled => Flow::Shutdown,
                Inbound::Note(note) => self.handle_notification(note).await,
                Inbound::Cmd(cmd) => self.handle_command(cmd).await,
            };

            match flow {
                Flow::Continue => {}
                Flow::Shutdown => {
                    return match self.terminate_children(true).await {
                        None => Ok(()),
                        Some(termination) => Err(SupervisorError::Termination(termination)),
                    };
                }
                Flow::Escalate(err) => return Err(err),
            }
        }
    }

    /// Consumes one child termination notification.
    async fn handle_notification(&mut self, note: ChildNotification) -> Flow {
        let Some(idx) = self.position(&note.name) else {
            return Flow::Continue;
        };
        {
            let slot = &mut self.slots[idx];
            if slot.runtime.is_none() || slot.generation != note.generation {
                // Stale: the instance was deliberately stopped or already
                // replaced.
                return Flow::Continue;
            }
            slot.runtime = None;
        }

        match &note.error {
            Some(err) => self.bus.publish(
                Event::now(EventKind::Failed)
                    .with_node(&note.name)
                    .with_runtime_name(&note.runtime_name)
                    .with_error(err.to_string()),
            ),
            None => self.bus.publish(
                Event::now(EventKind::Terminated)
                    .with_node(&note.name)
                    .with_runtime_name(&note.runtime_name),
            ),
        }

        let needs_restart = match self.slots[idx].node.restart() {
            Restart::Permanent => true,
            Restart::Transient => note.error.is_some(),
            Restart::Temporary => false,
        };
        if !needs_restart {
            self.slots[idx].inert = true;
            return Flow::Continue;
        }

        self.restart_members(idx, note.error).await
    }

    /// Consumes one dynamic-management command.
    async fn handle_command(&mut self, cmd: SupervisorCommand) -> Flow {
        match cmd {
            SupervisorCommand::Spawn { node, respond_to } => {
                if self.position(node.name()).is_some() {
                    let _ = respond_to.send(Err(SupervisorError::Build(
                        BuildError::DuplicateName {
                            name: node.name().to_string(),
                        },
                    )));
                    return Flow::Continue;
                }

                self.slots.push(Slot::new(node));
                let idx = self.slots.len() - 1;
                match self.start_child(idx).await {
                    Ok(()) => {
                        let _ = respond_to.send(Ok(()));
                        Flow::Continue
                    }
                    Err(StartFailure::Cancelled { node_name }) => {
                        self.slots.pop();
                        let _ = respond_to.send(Err(self.start_error(
                            node_name,
                            ChildError::Task(TaskError::Canceled),
                        )));
                        Flow::Shutdown
                    }
                    Err(StartFailure::Failed { node_name, cause }) => {
                        self.slots.pop();
                        let _ = respond_to.send(Err(self.start_error(node_name, cause)));
                        Flow::Continue
                    }
                }
            }
            SupervisorCommand::Stop { name, respond_to } => {
                let Some(idx) = self.position(&name) else {
                    // Already gone; deliberate stops are idempotent.
                    let _ = respond_to.send(None);
                    return Flow::Continue;
                };
                let slot = self.slots.remove(idx);
                let result = match slot.runtime {
                    Some(runtime) => {
                        let runtime_name = runtime.runtime_name().to_string();
                        let stopped = runtime.stop(slot.node.shutdown()).await;
                        self.publish_stop_result(slot.node.name(), &runtime_name, &stopped);
                        stopped
                    }
                    None => None,
                };
                let _ = respond_to.send(result);
                Flow::Continue
            }
        }
    }

    // ---------------------------
    // Restarting
    // ---------------------------

    /// Executes the acted-on-set procedure for a failure of `failed_idx`:
    /// account the restart, stop the set in reverse order, start it again
    /// in order.
    async fn restart_members(&mut self, failed_idx: usize, cause: Option<ChildError>) -> Flow {
        if self.window.record() {
            return self.escalate(failed_idx, cause).await;
        }

        let len = self.slots.len();
        let members: Vec<usize> = match self.spec.strategy() {
            Strategy::OneForOne => vec![failed_idx],
            Strategy::OneForAll => (0..len).collect(),
            Strategy::RestForOne => (failed_idx..len).collect(),
        };
        let mut start_order: Vec<usize> = members
            .into_iter()
            .filter(|&i| !self.slots[i].inert)
            .collect();
        if self.spec.order() == Order::RightToLeft {
            start_order.reverse();
        }

        // Stop phase: reverse start order. The failing child already
        // exited, so it is skipped. Errors are collected, never aborting
        // the loop.
        for &i in start_order.iter().rev() {
            if i == failed_idx {
                continue;
            }
            if let Some(runtime) = self.slots[i].runtime.take() {
                let runtime_name = runtime.runtime_name().to_string();
                let stopped = runtime.stop(self.slots[i].node.shutdown()).await;
                let node_name = self.slots[i].node.name().to_string();
                self.publish_stop_result(&node_name, &runtime_name, &stopped);
            }
        }

        // Start phase: declaration order, each member acked before the
        // next. A member that fails to start counts against the same
        // window and is retried.
        for &i in &start_order {
            loop {
                match self.start_child(i).await {
                    Ok(()) => {
                        self.slots[i].restart_count += 1;
                        let runtime_name = self.slots[i]
                            .runtime
                            .as_ref()
                            .map(|r| r.runtime_name().to_string())
                            .unwrap_or_default();
                        self.bus.publish(
                            Event::now(EventKind::Restarted)
                                .with_node(self.slots[i].node.name())
                                .with_runtime_name(runtime_name)
                                .with_restarts(self.slots[i].restart_count),
                        );
                        break;
                    }
                    Err(StartFailure::Cancelled { .. }) => return Flow::Shutdown,
                    Err(StartFailure::Failed { node_name, cause }) => {
                        self.bus.publish(
                            Event::now(EventKind::Failed)
                                .with_node(&node_name)
                                .with_error(cause.to_string()),
                        );
                        if self.window.record() {
                            return self.escalate(i, Some(cause)).await;
                        }
                    }
                }
            }
        }

        Flow::Continue
    }

    /// Tolerance surpassed: tear everything down and report the restart
    /// error upward.
    async fn escalate(&mut self, failing_idx: usize, cause: Option<ChildError>) -> Flow {
        let tolerance = ToleranceExceeded {
            node_name: self.slots[failing_idx].node.name().to_string(),
            error: cause,
            restarts: self.window.count(),
            intensity: self.window.tolerance().intensity,
            period: self.window.tolerance().period,
        };
        let termination = self.terminate_children(true).await;
        Flow::Escalate(SupervisorError::Restart(RestartError {
            runtime_name: self.runtime_name.clone(),
            tolerance,
            termination,
        }))
    }

    // ---------------------------
    // Terminating
    // ---------------------------

    /// Stops every live child in reverse start order, each honoring its
    /// shutdown policy, then runs the cleanup callback and (optionally) the
    /// terminate hook. Collected errors become one termination error.
    ///
    /// Also the rollback path for partial starts (`run_hooks = false`): the
    /// started siblings are exactly the slots holding a runtime.
    async fn terminate_children(&mut self, run_hooks: bool) -> Option<TerminationError> {
        let mut node_errors = BTreeMap::new();

        for idx in self.spec.order().stop_indices(self.slots.len()) {
            if let Some(runtime) = self.slots[idx].runtime.take() {
                let runtime_name = runtime.runtime_name().to_string();
                let stopped = runtime.stop(self.slots[idx].node.shutdown()).await;
                let node_name = self.slots[idx].node.name().to_string();
                self.publish_stop_result(&node_name, &runtime_name, &stopped);
                if let Some(err) = stopped {
                    node_errors.insert(node_name, err);
                }
            }
        }

        let cleanup = self.spec.cleanup().and_then(|f| f.as_ref()().err());

        if run_hooks {
            if let Some(hook) = self.spec.on_terminate() {
                hook.as_ref()(&self.runtime_name);
            }
        }

        if node_errors.is_empty() && cleanup.is_none() {
            None
        } else {
            Some(TerminationError {
                runtime_name: self.runtime_name.clone(),
                node_errors,
                cleanup,
            })
        }
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.node.name() == name)
    }

    fn start_error(&self, node_name: String, cause: ChildError) -> SupervisorError {
        SupervisorError::Start(StartError {
            runtime_name: self.runtime_name.clone(),
            node_name,
            cause,
            termination: None,
        })
    }

    fn publish_stop_result(
        &self,
        node_name: &str,
        runtime_name: &str,
        stopped: &Option<ChildError>,
    ) {
        match stopped {
            None => self.bus.publish(
                Event::now(EventKind::Terminated)
                    .with_node(node_name)
                    .with_runtime_name(runtime_name),
            ),
            Some(err) => self.bus.publish(
                Event::now(EventKind::Failed)
                    .with_node(node_name)
                    .with_runtime_name(runtime_name)
                    .with_error(err.to_string()),
            ),
        }
    }
}
