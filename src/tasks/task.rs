//! # Task abstraction for supervised execution.
//!
//! Defines the core [`Task`] trait for async, cancelable units of work and
//! the [`StartNotifier`] half of the start-acknowledgement protocol.
//!
//! - **[`Task`]** — trait for implementing async tasks with cancellation support
//! - **[`TaskRef`]** — shared handle (`Arc<dyn Task>`) for passing tasks across the runtime
//! - **[`BoxTaskFuture`]** — type alias for boxed task futures
//! - **[`StartNotifier`]** — one-shot readiness acknowledgement handed to each task
//!
//! ## Rules
//! - The crate provides [`TaskFn`](crate::TaskFn) — a function-backed implementation that wraps closures as tasks.
//! - Tasks receive a [`CancellationToken`] and **must** check `is_cancelled()` periodically to enable graceful shutdown.
//! - Tasks must invoke their [`StartNotifier`] exactly once; the parent
//!   supervisor waits on it before starting the next sibling. Returning
//!   without invoking it is reported as a start failure.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{ChildError, TaskError};

/// Boxed future returned by [`Task::spawn`].
///
/// This is a type alias for `Pin<Box<dyn Future<...>>>`:
/// - **Boxed**: Required for trait objects (dynamic dispatch)
/// - **Pinned**: Required for async futures (self-referential structs)
/// - **Send**: Task futures can be sent across threads
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task object.
///
/// Type alias for `Arc<dyn Task>`, used throughout the runtime for:
/// - Attaching task bodies to [`ChildSpec`](crate::ChildSpec)s
/// - Re-spawning fresh instances across restarts
/// - Cloning task references cheaply
pub type TaskRef = Arc<dyn Task>;

/// One-shot acknowledgement a task sends its parent supervisor to confirm
/// readiness.
///
/// The notifier is consumed by [`success`](StartNotifier::success) or
/// [`failure`](StartNotifier::failure), so it cannot be invoked twice.
/// Dropping it without calling either and then returning is reported to the
/// parent as a "returned before ack" start failure.
pub struct StartNotifier {
    tx: Option<oneshot::Sender<Result<(), ChildError>>>,
}

impl StartNotifier {
    pub(crate) fn new(tx: oneshot::Sender<Result<(), ChildError>>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Confirms the task has started; the parent proceeds to the next
    /// sibling.
    pub fn success(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Ok(()));
        }
    }

    /// Reports that the task could not start.
    pub fn failure(mut self, err: TaskError) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(ChildError::Task(err)));
        }
    }

    /// Reports a child-level start failure (used by subtree runtimes).
    pub(crate) fn fail_child(mut self, err: ChildError) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(err));
        }
    }
}

/// Asynchronous, cancelable unit of work.
///
/// A `Task` represents a unit of work that can be:
/// - **Spawned multiple times** (via [`spawn`](Task::spawn)) — once per restart
/// - **Cancelled cooperatively** (via [`CancellationToken`])
/// - **Supervised** (as the body of a [`ChildSpec`](crate::ChildSpec))
///
/// ## Rules
///
/// - **Stateless spawning**: `spawn(&self)` is `Fn`, not `FnMut` — no shared mutable state
/// - **Fresh futures**: Each `spawn()` call creates a **new** independent future
/// - **Cancellation**: Implementations **must** check `ctx.is_cancelled()` periodically
/// - **Readiness**: the future must invoke its [`StartNotifier`] once startup
///   is complete, before settling into its steady-state work
///
/// ## Example
///
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use taskwarden::{BoxTaskFuture, StartNotifier, Task};
///
/// struct Ticker;
///
/// impl Task for Ticker {
///     fn spawn(&self, ctx: CancellationToken, started: StartNotifier) -> BoxTaskFuture {
///         Box::pin(async move {
///             started.success();
///             while !ctx.is_cancelled() {
///                 tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///             }
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Creates a new future that runs the task until completion or cancellation.
    ///
    /// ### Cancellation requirements
    /// - The returned future **must** check `ctx.is_cancelled()` periodically and exit promptly.
    /// - The runtime cannot preempt a task that ignores its token; it only
    ///   waits out the shutdown budget and abandons the task.
    ///
    /// ### Stateless execution
    /// This method takes `&self` (not `&mut self`), meaning:
    /// - Each restart receives an independent future
    /// - No shared mutable state between spawns
    fn spawn(&self, ctx: CancellationToken, started: StartNotifier) -> BoxTaskFuture;
}
