//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken, StartNotifier) -> Fut`,
//! producing a fresh future per spawn. This avoids shared mutable state and
//! needs no locking.
//!
//! ## Concurrency semantics
//! - Each call to [`Task::spawn`] creates a **new** future owning its state.
//! - No hidden mutation between restarts; if shared state is needed, capture
//!   an `Arc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use taskwarden::{StartNotifier, TaskError, TaskFn, TaskRef};
//!
//! let t: TaskRef = TaskFn::arc(|ctx: CancellationToken, started: StartNotifier| async move {
//!     started.success();
//!     ctx.cancelled().await;
//!     Ok::<_, TaskError>(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, StartNotifier, Task, TaskRef};

/// Function-backed task implementation.
///
/// Wraps a closure that *creates* a new future per spawn.
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(CancellationToken, StartNotifier) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    /// Creates the task and returns it as a shared handle (`Arc<dyn Task>`).
    pub fn arc(f: F) -> TaskRef {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken, StartNotifier) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn spawn(&self, ctx: CancellationToken, started: StartNotifier) -> BoxTaskFuture {
        let fut = (self.f)(ctx, started);
        Box::pin(fut)
    }
}
