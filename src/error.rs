//! # Error types used by the supervision runtime and tasks.
//!
//! Two layers of errors live here:
//!
//! - [`TaskError`] errors raised by individual worker bodies.
//! - [`ChildError`] the terminal error of one child instance as its parent
//!   supervisor sees it (a task error, a shutdown timeout, a start-protocol
//!   violation, or a failed subtree).
//!
//! Supervisor-level failures are classified into exactly four kinds, wrapped
//! by [`SupervisorError`]:
//!
//! - [`BuildError`] a spec builder or a children build function failed.
//! - [`StartError`] a child failed to start; carries rollback results.
//! - [`TerminationError`] one or more children failed to stop cleanly.
//! - [`RestartError`] restart tolerance surpassed; carries the window state.
//!
//! Every supervisor-level error implements [`ErrorKvs`], a flat key/value
//! projection for structured logging. Keys are rooted at `supervisor.*`;
//! when a node error is itself a supervisor error (a failed subtree), its
//! keys are re-rooted under `supervisor.subtree.<i>.*` with the original
//! `supervisor.` prefix stripped, so the full path-qualified cause chain of
//! a nested tree flattens into one map.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

/// Flat key/value projection of an error for structured logging.
///
/// The map is ordered (`BTreeMap`) so projections are deterministic and
/// stable across runs, which keeps log-based assertions and alert rules
/// honest.
pub trait ErrorKvs {
    /// Returns the structured key/value form of this error.
    fn kvs(&self) -> BTreeMap<String, String>;
}

fn strip_supervisor_prefix(key: &str) -> &str {
    key.strip_prefix("supervisor.").unwrap_or(key)
}

/// # Errors produced by worker task bodies.
///
/// These represent failures of the user logic running inside a worker.
/// The runtime forwards them to the parent supervisor untouched; it never
/// logs and swallows them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {reason}")]
    Fail {
        /// Human-readable failure reason.
        reason: String,
    },

    /// Non-recoverable error. Panics caught at the task boundary are
    /// reported through this variant.
    #[error("fatal error: {reason}")]
    Fatal {
        /// Human-readable failure reason.
        reason: String,
    },

    /// Task observed cancellation and returned.
    ///
    /// This is **not an error** in the traditional sense: the runtime
    /// treats it as a clean exit during deliberate stops.
    #[error("canceled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(reason: impl Into<String>) -> Self {
        TaskError::Fatal {
            reason: reason.into(),
        }
    }
}

/// Terminal error of one child instance, as observed by its parent.
#[derive(Error, Debug, Clone)]
pub enum ChildError {
    /// The worker body returned an error.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The child was cancelled but did not return within its shutdown
    /// budget. The task itself is abandoned, not killed; cooperative
    /// cancellation cannot preempt it.
    #[error("'{runtime_name}' did not return within its shutdown budget of {timeout:?}")]
    ShutdownTimeout {
        /// Path-qualified name of the abandoned child.
        runtime_name: String,
        /// The exhausted budget.
        timeout: Duration,
    },

    /// The start function returned before invoking its start notifier.
    #[error("start function returned before signaling readiness")]
    ReturnedBeforeAck,

    /// A child subtree terminated with a supervisor-level failure.
    #[error(transparent)]
    Subtree(Box<SupervisorError>),
}

impl ChildError {
    /// Structured keys of the underlying subtree failure, if this error
    /// escalated out of a nested supervisor.
    fn subtree_kvs(&self) -> Option<BTreeMap<String, String>> {
        match self {
            ChildError::Subtree(err) => Some(err.kvs()),
            _ => None,
        }
    }
}

/// A spec builder or a children build function failed.
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// Node names must be non-empty.
    #[error("node name must not be empty")]
    EmptyName,

    /// Node names must not contain the path separator used for runtime
    /// names.
    #[error("node name '{name}' contains the reserved path separator '/'")]
    ReservedName {
        /// The offending name.
        name: String,
    },

    /// Sibling names must be unique within one supervisor.
    #[error("node name '{name}' is already taken by a sibling")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// The restart tolerance window must have a positive width.
    #[error("restart tolerance period of supervisor '{name}' must be greater than zero")]
    ZeroPeriod {
        /// Name of the supervisor spec being built.
        name: String,
    },

    /// The user-supplied children build function failed. The supervisor
    /// never entered its running phase.
    #[error("build function of supervisor '{runtime_name}' failed")]
    Nodes {
        /// Path-qualified name of the supervisor that was being built.
        runtime_name: String,
        /// The cause reported by the build function.
        #[source]
        cause: TaskError,
    },
}

impl ErrorKvs for BuildError {
    fn kvs(&self) -> BTreeMap<String, String> {
        let mut acc = BTreeMap::new();
        match self {
            BuildError::Nodes {
                runtime_name,
                cause,
            } => {
                acc.insert("supervisor.name".into(), runtime_name.clone());
                acc.insert("supervisor.build.error".into(), cause.to_string());
            }
            other => {
                acc.insert("supervisor.build.error".into(), other.to_string());
            }
        }
        acc
    }
}

/// A child failed to start.
///
/// Carries the offending node, its start error, and the results of rolling
/// back the siblings that had already started (stopped again in reverse
/// declaration order).
#[derive(Error, Debug, Clone)]
#[error("supervisor '{runtime_name}' failed to start node '{node_name}'")]
pub struct StartError {
    pub(crate) runtime_name: String,
    pub(crate) node_name: String,
    pub(crate) cause: ChildError,
    pub(crate) termination: Option<TerminationError>,
}

impl StartError {
    /// Path-qualified name of the supervisor that failed to start.
    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    /// Declared name of the node that failed to start.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The start failure itself.
    pub fn cause(&self) -> &ChildError {
        &self.cause
    }

    /// Errors collected while rolling back already-started siblings.
    pub fn termination(&self) -> Option<&TerminationError> {
        self.termination.as_ref()
    }
}

impl ErrorKvs for StartError {
    fn kvs(&self) -> BTreeMap<String, String> {
        let mut acc = BTreeMap::new();
        acc.insert("supervisor.name".into(), self.runtime_name.clone());

        match self.cause.subtree_kvs() {
            Some(sub) => {
                for (k, v) in sub {
                    let key = format!("supervisor.subtree.{}", strip_supervisor_prefix(&k));
                    acc.insert(key, v);
                }
            }
            None => {
                acc.insert("supervisor.start.node.name".into(), self.node_name.clone());
                acc.insert("supervisor.start.node.error".into(), self.cause.to_string());
            }
        }

        if let Some(termination) = &self.termination {
            acc.extend(termination.kvs());
        }
        acc
    }
}

/// One or more children failed to stop cleanly during teardown.
#[derive(Error, Debug, Clone)]
#[error("supervisor '{runtime_name}' terminated with failures")]
pub struct TerminationError {
    pub(crate) runtime_name: String,
    pub(crate) node_errors: BTreeMap<String, ChildError>,
    pub(crate) cleanup: Option<TaskError>,
}

impl TerminationError {
    /// Path-qualified name of the supervisor that terminated.
    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    /// Stop errors keyed by node name, in name order.
    pub fn node_errors(&self) -> &BTreeMap<String, ChildError> {
        &self.node_errors
    }

    /// Error reported by the resource cleanup callback, if any.
    pub fn cleanup(&self) -> Option<&TaskError> {
        self.cleanup.as_ref()
    }

    /// Maps a panicked supervisor task onto the taxonomy.
    pub(crate) fn panicked(runtime_name: String) -> Self {
        let mut node_errors = BTreeMap::new();
        node_errors.insert(
            runtime_name.clone(),
            ChildError::Task(TaskError::fatal("supervisor task panicked")),
        );
        TerminationError {
            runtime_name,
            node_errors,
            cleanup: None,
        }
    }
}

impl ErrorKvs for TerminationError {
    fn kvs(&self) -> BTreeMap<String, String> {
        let mut acc = BTreeMap::new();
        acc.insert("supervisor.name".into(), self.runtime_name.clone());

        for (i, (node_name, node_err)) in self.node_errors.iter().enumerate() {
            match node_err.subtree_kvs() {
                Some(sub) => {
                    for (k, v) in sub {
                        let key =
                            format!("supervisor.subtree.{}.{}", i, strip_supervisor_prefix(&k));
                        acc.insert(key, v);
                    }
                }
                None => {
                    acc.insert(
                        format!("supervisor.termination.node.{i}.name"),
                        node_name.clone(),
                    );
                    acc.insert(
                        format!("supervisor.termination.node.{i}.error"),
                        node_err.to_string(),
                    );
                }
            }
        }

        if let Some(cleanup) = &self.cleanup {
            acc.insert(
                "supervisor.termination.cleanup.error".into(),
                cleanup.to_string(),
            );
        }
        acc
    }
}

/// Window state at the moment the restart tolerance was surpassed.
#[derive(Debug, Clone)]
pub struct ToleranceExceeded {
    pub(crate) node_name: String,
    pub(crate) error: Option<ChildError>,
    pub(crate) restarts: u32,
    pub(crate) intensity: u32,
    pub(crate) period: Duration,
}

impl ToleranceExceeded {
    /// Declared name of the child whose restart tripped the window.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Terminal error of the offending child, if it failed (as opposed to
    /// failing to start again).
    pub fn error(&self) -> Option<&ChildError> {
        self.error.as_ref()
    }

    /// Restart events inside the window when it tripped.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Configured maximum of tolerated restarts.
    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    /// Configured window width.
    pub fn period(&self) -> Duration {
        self.period
    }

    fn window_kvs(&self) -> BTreeMap<String, String> {
        let mut acc = BTreeMap::new();
        acc.insert("node.name".into(), self.node_name.clone());
        acc.insert("count".into(), self.restarts.to_string());
        acc.insert("intensity".into(), self.intensity.to_string());
        acc.insert("period".into(), format!("{:?}", self.period));
        acc
    }
}

/// Restart tolerance surpassed.
///
/// Carries the offending child and its terminal error, the window state,
/// and any errors collected while tearing down the remaining siblings.
#[derive(Error, Debug, Clone)]
#[error("supervisor '{runtime_name}' crashed: restart tolerance surpassed")]
pub struct RestartError {
    pub(crate) runtime_name: String,
    pub(crate) tolerance: ToleranceExceeded,
    pub(crate) termination: Option<TerminationError>,
}

impl RestartError {
    /// Path-qualified name of the supervisor that crashed.
    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    /// The window state and offending child.
    pub fn tolerance(&self) -> &ToleranceExceeded {
        &self.tolerance
    }

    /// Errors collected while tearing down the remaining siblings.
    pub fn termination(&self) -> Option<&TerminationError> {
        self.termination.as_ref()
    }
}

impl ErrorKvs for RestartError {
    fn kvs(&self) -> BTreeMap<String, String> {
        let mut acc = BTreeMap::new();
        acc.insert("supervisor.name".into(), self.runtime_name.clone());

        for (k, v) in self.tolerance.window_kvs() {
            acc.insert(format!("supervisor.restart.{k}"), v);
        }

        match self.tolerance.error.as_ref().and_then(|e| e.subtree_kvs()) {
            Some(sub) => {
                // The offending child was itself a supervisor: re-root its
                // projection under subtree index 0.
                for (k, v) in sub {
                    let key = format!("supervisor.subtree.0.{}", strip_supervisor_prefix(&k));
                    acc.insert(key, v);
                }
            }
            None => {
                if let Some(err) = &self.tolerance.error {
                    acc.insert("supervisor.restart.node.error".into(), err.to_string());
                }
            }
        }

        if let Some(termination) = &self.termination {
            acc.extend(termination.kvs());
        }
        acc
    }
}

/// Any supervisor-level failure.
#[derive(Error, Debug, Clone)]
pub enum SupervisorError {
    /// See [`BuildError`].
    #[error(transparent)]
    Build(#[from] BuildError),

    /// See [`StartError`].
    #[error(transparent)]
    Start(#[from] StartError),

    /// See [`TerminationError`].
    #[error(transparent)]
    Termination(#[from] TerminationError),

    /// See [`RestartError`].
    #[error(transparent)]
    Restart(#[from] RestartError),
}

impl ErrorKvs for SupervisorError {
    fn kvs(&self) -> BTreeMap<String, String> {
        match self {
            SupervisorError::Build(e) => e.kvs(),
            SupervisorError::Start(e) => e.kvs(),
            SupervisorError::Termination(e) => e.kvs(),
            SupervisorError::Restart(e) => e.kvs(),
        }
    }
}
