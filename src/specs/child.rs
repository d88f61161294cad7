//! # Worker child specification.
//!
//! [`ChildSpec`] is the immutable template from which worker instances are
//! spawned: a name, a restart policy, a shutdown policy, and the task body.
//!
//! A spec can be created:
//! - **Fluently** with [`ChildSpec::builder`] (full control)
//! - **Directly** with [`ChildSpec::worker`] for bodies that need no
//!   explicit start acknowledgement
//!
//! ## Defaults
//! - `restart = Restart::Permanent`
//! - `shutdown = Shutdown::Timeout(5s)`

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{BuildError, TaskError};
use crate::specs::validate_name;
use crate::tasks::{StartNotifier, TaskFn, TaskRef};

/// Kind of node a running child is, a closed set: the tree only ever holds
/// workers and supervisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildTag {
    /// A leaf running business logic.
    Worker,
    /// A nested supervision tree.
    Supervisor,
}

/// When a terminated child gets restarted (consulted for the child's own
/// exits; siblings forced into a group restart are restarted regardless).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restart {
    /// Always restart, whether the child exited cleanly or with an error.
    Permanent,
    /// Restart if and only if the child exited with an error.
    Transient,
    /// Never restart; after its first exit the slot stays inert.
    Temporary,
}

impl Default for Restart {
    /// Returns [`Restart::Permanent`].
    fn default() -> Self {
        Restart::Permanent
    }
}

/// How long the parent waits for a cancelled child to return.
///
/// Exceeding a [`Shutdown::Timeout`] does not kill the task — cooperative
/// cancellation cannot preempt a task that ignores its token. The parent
/// reports a shutdown-timeout error and abandons it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Wait unboundedly. The default for supervisors, so their own ordered
    /// teardown always runs to completion.
    Infinity,
    /// Wait at most this long. The default for workers (5 seconds).
    Timeout(Duration),
}

pub(crate) const DEFAULT_WORKER_SHUTDOWN: Duration = Duration::from_secs(5);

/// Immutable template describing how to start one worker.
#[derive(Clone)]
pub struct ChildSpec {
    name: Cow<'static, str>,
    restart: Restart,
    shutdown: Shutdown,
    task: TaskRef,
}

impl std::fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSpec")
            .field("name", &self.name)
            .field("restart", &self.restart)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl ChildSpec {
    /// Creates a builder for constructing a `ChildSpec` with a fluent API.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> ChildSpecBuilder {
        ChildSpecBuilder::new(name)
    }

    /// Builds a worker spec with default policies from a body that needs no
    /// explicit start acknowledgement: readiness is acknowledged
    /// immediately, then the body runs.
    pub fn worker<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Result<Self, BuildError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        ChildSpecBuilder::new(name).build(f)
    }

    /// Returns the declared name (unique among siblings).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the restart policy.
    pub fn restart(&self) -> Restart {
        self.restart
    }

    /// Returns the shutdown policy.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown
    }

    pub(crate) fn task(&self) -> &TaskRef {
        &self.task
    }
}

/// Builder for [`ChildSpec`] with a fluent API.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskwarden::{ChildSpec, Restart, Shutdown, TaskError};
///
/// let spec = ChildSpec::builder("poller")
///     .with_restart(Restart::Transient)
///     .with_shutdown(Shutdown::Timeout(Duration::from_secs(1)))
///     .build(|ctx| async move {
///         ctx.cancelled().await;
///         Ok::<_, TaskError>(())
///     })
///     .expect("valid spec");
///
/// assert_eq!(spec.name(), "poller");
/// assert_eq!(spec.restart(), Restart::Transient);
/// ```
#[derive(Clone)]
pub struct ChildSpecBuilder {
    name: Cow<'static, str>,
    restart: Restart,
    shutdown: Shutdown,
}

impl ChildSpecBuilder {
    /// Creates a new builder with the given node name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            restart: Restart::default(),
            shutdown: Shutdown::Timeout(DEFAULT_WORKER_SHUTDOWN),
        }
    }

    /// Overrides the restart policy.
    pub fn with_restart(mut self, restart: Restart) -> Self {
        self.restart = restart;
        self
    }

    /// Overrides the shutdown policy.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Builds the spec from a body that needs no explicit start
    /// acknowledgement: readiness is acknowledged immediately, then the
    /// body runs.
    pub fn build<F, Fut>(self, f: F) -> Result<ChildSpec, BuildError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let task = TaskFn::arc(move |ctx: CancellationToken, started: StartNotifier| {
            let fut = f(ctx);
            async move {
                started.success();
                fut.await
            }
        });
        self.build_from_task(task)
    }

    /// Builds the spec from a body that performs its own startup and
    /// acknowledges readiness through the [`StartNotifier`].
    pub fn build_with_ack<F, Fut>(self, f: F) -> Result<ChildSpec, BuildError>
    where
        F: Fn(CancellationToken, StartNotifier) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.build_from_task(TaskFn::arc(f))
    }

    /// Builds the spec from an existing [`TaskRef`].
    pub fn build_from_task(self, task: TaskRef) -> Result<ChildSpec, BuildError> {
        validate_name(&self.name)?;
        Ok(ChildSpec {
            name: self.name,
            restart: self.restart,
            shutdown: self.shutdown,
            task,
        })
    }
}
