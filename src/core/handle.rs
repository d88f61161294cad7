//! # Dynamic-management handles.
//!
//! A running supervisor accepts two commands over its inbound channel:
//! spawn a dynamic child, stop a child by name. [`SupervisorHandle`] is the
//! cloneable client side of that channel and implements [`Spawner`];
//! [`ChildHandle`] is the stop handle returned for each dynamic child.
//!
//! ## Rules
//! - Commands are processed by the supervisor's own loop, serialized with
//!   child notifications and cancellation.
//! - Spawning awaits the child's start acknowledgement, like any declared
//!   child.
//! - Stops are idempotent: stopping a child that already finished (or a
//!   supervisor that is already gone) succeeds.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::{ChildError, StartError, SupervisorError, TaskError};
use crate::specs::Node;

/// Commands accepted by a running supervisor.
pub(crate) enum SupervisorCommand {
    /// Insert and start a dynamic child at the end of the child list.
    Spawn {
        node: Node,
        respond_to: oneshot::Sender<Result<(), SupervisorError>>,
    },
    /// Stop a child by declared name, honoring its shutdown policy, and
    /// remove its slot.
    Stop {
        name: String,
        respond_to: oneshot::Sender<Option<ChildError>>,
    },
}

/// Inserts dynamic children under a running supervisor.
///
/// Consumed by clients that grow the tree at runtime, such as fault
/// injectors spawning probe workers on demand.
#[async_trait]
pub trait Spawner: Send + Sync {
    /// Starts `node` as a dynamic child of the supervisor behind this
    /// spawner and returns its stop handle.
    ///
    /// The call resolves once the child has acknowledged start (or failed
    /// to).
    async fn spawn(&self, node: Node) -> Result<ChildHandle, SupervisorError>;
}

/// Cloneable handle to a running supervisor's command channel.
#[derive(Clone)]
pub struct SupervisorHandle {
    runtime_name: String,
    cmd_tx: mpsc::UnboundedSender<SupervisorCommand>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        runtime_name: String,
        cmd_tx: mpsc::UnboundedSender<SupervisorCommand>,
    ) -> Self {
        Self {
            runtime_name,
            cmd_tx,
        }
    }

    /// Path-qualified name of the supervisor behind this handle.
    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    /// The supervisor is no longer consuming commands; surfaced as a start
    /// failure caused by cancellation.
    fn closed(&self, node_name: &str) -> SupervisorError {
        SupervisorError::Start(StartError {
            runtime_name: self.runtime_name.clone(),
            node_name: node_name.to_string(),
            cause: ChildError::Task(TaskError::Canceled),
            termination: None,
        })
    }
}

#[async_trait]
impl Spawner for SupervisorHandle {
    async fn spawn(&self, node: Node) -> Result<ChildHandle, SupervisorError> {
        let name = node.name().to_string();
        let (respond_to, response) = oneshot::channel();

        self.cmd_tx
            .send(SupervisorCommand::Spawn { node, respond_to })
            .map_err(|_| self.closed(&name))?;

        match response.await {
            Ok(Ok(())) => Ok(ChildHandle {
                name,
                cmd_tx: self.cmd_tx.clone(),
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(self.closed(&name)),
        }
    }
}

/// Stop handle for one dynamic child.
#[derive(Clone, Debug)]
pub struct ChildHandle {
    name: String,
    cmd_tx: mpsc::UnboundedSender<SupervisorCommand>,
}

impl ChildHandle {
    /// Declared name of the child this handle controls.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the child, honoring its shutdown policy, and removes it from
    /// the supervisor.
    ///
    /// Returns the child's stop error if it failed to stop cleanly. Stopping
    /// a child that already finished, or whose supervisor is gone, is `Ok`.
    pub async fn stop(&self) -> Result<(), ChildError> {
        let (respond_to, response) = oneshot::channel();

        let sent = self.cmd_tx.send(SupervisorCommand::Stop {
            name: self.name.clone(),
            respond_to,
        });
        if sent.is_err() {
            // Supervisor gone: its teardown already stopped the child.
            return Ok(());
        }

        match response.await {
            Ok(None) | Err(_) => Ok(()),
            Ok(Some(err)) => Err(err),
        }
    }
}
