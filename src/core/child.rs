//! # Child runtime: one live instance of a node.
//!
//! [`spawn`] turns a [`Node`] spec into a running tokio task plus a
//! [`ChildRuntime`] handle owned by the parent supervisor. The protocol:
//!
//! ```text
//! spawn(node)
//!   ├─► worker body / subtree runtime starts on its own task
//!   ├─► ack (oneshot): the instance confirms readiness exactly once;
//!   │   the parent awaits it before starting the next sibling
//!   ├─► done (oneshot): terminal error of the instance, consumed by
//!   │   wait() during deliberate stops
//!   └─► notification (unbounded mpsc): the same terminal error delivered
//!       to the parent's inbound channel for failure handling
//! ```
//!
//! ## Rules
//! - Each instance owns an **independent** cancellation token; the parent
//!   cancels instances one at a time to keep stop order strictly sequential.
//! - A body that returns before acking is a start failure (the dropped ack
//!   sender is the detection signal).
//! - Panics are caught at this boundary and become terminal errors; they
//!   never unwind into the supervisor.
//! - `done` is sent before the notification so a parent blocked in `wait`
//!   is released even if its inbound queue is long.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::notification::ChildNotification;
use crate::core::supervisor::SupervisorRuntime;
use crate::error::{ChildError, TaskError};
use crate::events::Bus;
use crate::specs::{Node, PATH_SEPARATOR, Shutdown};
use crate::tasks::StartNotifier;

/// Live instance of a node, owned by its parent supervisor.
pub(crate) struct ChildRuntime {
    runtime_name: String,
    token: CancellationToken,
    done: oneshot::Receiver<Option<ChildError>>,
}

/// A freshly spawned instance whose start acknowledgement is still pending.
pub(crate) struct PendingChild {
    pub(crate) runtime: ChildRuntime,
    pub(crate) ack: oneshot::Receiver<Result<(), ChildError>>,
}

/// Spawns one instance of `node` under `parent_runtime_name`.
///
/// `generation` stamps the instance's termination notification so the
/// parent can discard notifications from replaced instances.
pub(crate) fn spawn(
    node: &Node,
    parent_runtime_name: &str,
    bus: &Bus,
    notify_tx: &mpsc::UnboundedSender<ChildNotification>,
    generation: u64,
) -> PendingChild {
    let name = node.name().to_string();
    let runtime_name = format!("{parent_runtime_name}{PATH_SEPARATOR}{name}");
    let token = CancellationToken::new();
    let (ack_tx, ack_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();
    let notify_tx = notify_tx.clone();

    match node {
        Node::Worker(spec) => {
            let body = spec.task().spawn(token.clone(), StartNotifier::new(ack_tx));
            let instance = runtime_name.clone();
            tokio::spawn(async move {
                let result = AssertUnwindSafe(body).catch_unwind().await;
                let error = match result {
                    Ok(Ok(())) => None,
                    // A body that observed cancellation and said so exited
                    // cleanly.
                    Ok(Err(TaskError::Canceled)) => None,
                    Ok(Err(e)) => Some(ChildError::Task(e)),
                    Err(panic) => Some(ChildError::Task(TaskError::fatal(panic_message(
                        panic.as_ref(),
                    )))),
                };
                let _ = done_tx.send(error.clone());
                let _ = notify_tx.send(ChildNotification {
                    name,
                    runtime_name: instance,
                    generation,
                    error,
                });
            });
        }
        Node::Supervisor(spec) => {
            let runtime = SupervisorRuntime::new(
                spec.clone(),
                runtime_name.clone(),
                token.clone(),
                bus.clone(),
            );
            let instance = runtime_name.clone();
            tokio::spawn(async move {
                let result = AssertUnwindSafe(runtime.run(StartNotifier::new(ack_tx)))
                    .catch_unwind()
                    .await;
                let error = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(ChildError::Subtree(Box::new(e))),
                    Err(panic) => Some(ChildError::Task(TaskError::fatal(panic_message(
                        panic.as_ref(),
                    )))),
                };
                let _ = done_tx.send(error.clone());
                let _ = notify_tx.send(ChildNotification {
                    name,
                    runtime_name: instance,
                    generation,
                    error,
                });
            });
        }
    }

    PendingChild {
        runtime: ChildRuntime {
            runtime_name,
            token,
            done: done_rx,
        },
        ack: ack_rx,
    }
}

impl ChildRuntime {
    /// Path-qualified name of this instance.
    pub(crate) fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    /// Triggers the instance's cancellation signal. Idempotent.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Blocks until the instance exits or the shutdown policy elapses.
    ///
    /// Returns the terminal error, a shutdown-timeout error when a finite
    /// budget expired (the task is abandoned, not killed), or `None` for a
    /// clean exit.
    pub(crate) async fn wait(self, shutdown: Shutdown) -> Option<ChildError> {
        match shutdown {
            Shutdown::Infinity => self.done.await.unwrap_or(None),
            Shutdown::Timeout(budget) => match timeout(budget, self.done).await {
                Ok(result) => result.unwrap_or(None),
                Err(_elapsed) => Some(ChildError::ShutdownTimeout {
                    runtime_name: self.runtime_name,
                    timeout: budget,
                }),
            },
        }
    }

    /// Cancels the instance and waits it out under its shutdown policy.
    pub(crate) async fn stop(self, shutdown: Shutdown) -> Option<ChildError> {
        self.cancel();
        self.wait(shutdown).await
    }
}

/// Extracts a printable message from a caught panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic: unknown payload".to_string()
    }
}
