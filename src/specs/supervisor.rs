//! # Supervisor specification.
//!
//! [`SupervisorSpec`] is the immutable template for one supervisor: an
//! ordered set of children, a restart [`Strategy`], a restart [`Tolerance`],
//! a start [`Order`], and lifecycle hooks.
//!
//! Children come either as a static list or from a fallible build function
//! that is re-invoked on every (re)start of the subtree, which is the place
//! to acquire per-incarnation resources. A matching cleanup callback runs
//! during teardown.
//!
//! ## Defaults
//! - `strategy = Strategy::OneForOne`
//! - `tolerance = 1 restart per 5 seconds`
//! - `order = Order::LeftToRight`
//! - `restart = Restart::Permanent` (as a child of its own parent)
//! - `shutdown = Shutdown::Infinity`

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BuildError, TaskError};
use crate::specs::node::Node;
use crate::specs::validate_name;
use crate::specs::{Restart, Shutdown};

/// Policy mapping "which child failed" to "which siblings must be
/// restarted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Restart only the failed child.
    OneForOne,
    /// Stop and restart every sibling when any child fails.
    OneForAll,
    /// Stop and restart the failed child and all siblings declared after
    /// it.
    RestForOne,
}

impl Default for Strategy {
    /// Returns [`Strategy::OneForOne`].
    fn default() -> Self {
        Strategy::OneForOne
    }
}

/// Bound on tolerated restarts: more than `intensity` restarts within a
/// rolling window of `period` crash the supervisor itself.
///
/// `intensity = 0` means any single restart escalates immediately.
/// `period` must be positive; builders reject zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    /// Maximum number of restarts allowed inside the window.
    pub intensity: u32,
    /// Window width.
    pub period: Duration,
}

impl Default for Tolerance {
    /// Returns 1 restart per 5 seconds.
    fn default() -> Self {
        Self {
            intensity: 1,
            period: Duration::from_secs(5),
        }
    }
}

/// Direction children are started in. Stop order is always the reverse of
/// start order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Start in declaration order (the default).
    LeftToRight,
    /// Start in reverse declaration order.
    RightToLeft,
}

impl Default for Order {
    /// Returns [`Order::LeftToRight`].
    fn default() -> Self {
        Order::LeftToRight
    }
}

impl Order {
    /// Slot indices in start order.
    pub(crate) fn start_indices(self, len: usize) -> Vec<usize> {
        match self {
            Order::LeftToRight => (0..len).collect(),
            Order::RightToLeft => (0..len).rev().collect(),
        }
    }

    /// Slot indices in stop order (reverse of start order).
    pub(crate) fn stop_indices(self, len: usize) -> Vec<usize> {
        let mut indices = self.start_indices(len);
        indices.reverse();
        indices
    }
}

/// Hook invoked with the supervisor's runtime name on lifecycle
/// transitions.
pub type LifecycleHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Fallible children build function, re-invoked on every (re)start of the
/// subtree.
pub type BuildNodesFn = Arc<dyn Fn() -> Result<Vec<Node>, TaskError> + Send + Sync>;

/// Resource cleanup callback run during teardown; its error is recorded in
/// the termination error.
pub type CleanupFn = Arc<dyn Fn() -> Result<(), TaskError> + Send + Sync>;

/// Where a supervisor's children come from.
#[derive(Clone)]
pub(crate) enum ChildrenSource {
    Static(Vec<Node>),
    Build(BuildNodesFn),
}

/// Immutable template describing one supervisor.
#[derive(Clone)]
pub struct SupervisorSpec {
    name: Cow<'static, str>,
    children: ChildrenSource,
    strategy: Strategy,
    tolerance: Tolerance,
    order: Order,
    restart: Restart,
    shutdown: Shutdown,
    on_start: Option<LifecycleHook>,
    on_terminate: Option<LifecycleHook>,
    cleanup: Option<CleanupFn>,
}

impl std::fmt::Debug for SupervisorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorSpec")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("tolerance", &self.tolerance)
            .field("order", &self.order)
            .field("restart", &self.restart)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl SupervisorSpec {
    /// Creates a builder for constructing a `SupervisorSpec` with a fluent
    /// API.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> SupervisorSpecBuilder {
        SupervisorSpecBuilder::new(name)
    }

    /// Returns the declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sibling restart strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns the restart tolerance.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Returns the start order.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Returns the restart policy this supervisor has as a child of its own
    /// parent.
    pub fn restart(&self) -> Restart {
        self.restart
    }

    /// Returns the shutdown policy this supervisor has as a child of its
    /// own parent.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown
    }

    pub(crate) fn children(&self) -> &ChildrenSource {
        &self.children
    }

    pub(crate) fn on_start(&self) -> Option<&LifecycleHook> {
        self.on_start.as_ref()
    }

    pub(crate) fn on_terminate(&self) -> Option<&LifecycleHook> {
        self.on_terminate.as_ref()
    }

    pub(crate) fn cleanup(&self) -> Option<&CleanupFn> {
        self.cleanup.as_ref()
    }
}

/// Builder for [`SupervisorSpec`] with a fluent API.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskwarden::{ChildSpec, Strategy, SupervisorSpec, TaskError};
///
/// let w1 = ChildSpec::worker("w1", |ctx| async move {
///     ctx.cancelled().await;
///     Ok::<_, TaskError>(())
/// })?;
///
/// let spec = SupervisorSpec::builder("root")
///     .with_strategy(Strategy::OneForAll)
///     .with_tolerance(3, Duration::from_secs(5))
///     .with_child(w1)
///     .build()?;
///
/// assert_eq!(spec.name(), "root");
/// # Ok::<(), taskwarden::BuildError>(())
/// ```
pub struct SupervisorSpecBuilder {
    name: Cow<'static, str>,
    children: Vec<Node>,
    build: Option<BuildNodesFn>,
    strategy: Strategy,
    tolerance: Tolerance,
    order: Order,
    restart: Restart,
    shutdown: Shutdown,
    on_start: Option<LifecycleHook>,
    on_terminate: Option<LifecycleHook>,
    cleanup: Option<CleanupFn>,
}

impl SupervisorSpecBuilder {
    /// Creates a new builder with the given supervisor name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            build: None,
            strategy: Strategy::default(),
            tolerance: Tolerance::default(),
            order: Order::default(),
            restart: Restart::default(),
            shutdown: Shutdown::Infinity,
            on_start: None,
            on_terminate: None,
            cleanup: None,
        }
    }

    /// Appends one child node (declaration order is start order).
    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Appends several child nodes.
    pub fn with_children(mut self, nodes: Vec<Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    /// Supplies children through a build function re-invoked on every
    /// (re)start of the subtree. Takes precedence over statically added
    /// children.
    pub fn with_build<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Vec<Node>, TaskError> + Send + Sync + 'static,
    {
        self.build = Some(Arc::new(f));
        self
    }

    /// Overrides the sibling restart strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the restart tolerance.
    pub fn with_tolerance(mut self, intensity: u32, period: Duration) -> Self {
        self.tolerance = Tolerance { intensity, period };
        self
    }

    /// Overrides the start order.
    pub fn with_start_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Overrides the restart policy this supervisor has as a child of its
    /// own parent.
    pub fn with_restart(mut self, restart: Restart) -> Self {
        self.restart = restart;
        self
    }

    /// Overrides the shutdown policy this supervisor has as a child of its
    /// own parent.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Installs a hook invoked with the runtime name once all children have
    /// acknowledged start.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Installs a hook invoked with the runtime name after teardown
    /// completes.
    pub fn on_terminate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_terminate = Some(Arc::new(hook));
        self
    }

    /// Installs a resource cleanup callback run during teardown.
    pub fn with_cleanup<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), TaskError> + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(f));
        self
    }

    /// Validates and builds the spec.
    pub fn build(self) -> Result<SupervisorSpec, BuildError> {
        validate_name(&self.name)?;
        if self.tolerance.period.is_zero() {
            return Err(BuildError::ZeroPeriod {
                name: self.name.to_string(),
            });
        }

        let children = match self.build {
            Some(f) => ChildrenSource::Build(f),
            None => {
                let mut seen = std::collections::HashSet::new();
                for node in &self.children {
                    if !seen.insert(node.name().to_string()) {
                        return Err(BuildError::DuplicateName {
                            name: node.name().to_string(),
                        });
                    }
                }
                ChildrenSource::Static(self.children)
            }
        };

        Ok(SupervisorSpec {
            name: self.name,
            children,
            strategy: self.strategy,
            tolerance: self.tolerance,
            order: self.order,
            restart: self.restart,
            shutdown: self.shutdown,
            on_start: self.on_start,
            on_terminate: self.on_terminate,
            cleanup: self.cleanup,
        })
    }
}
