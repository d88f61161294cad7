//! # Immutable node specifications.
//!
//! A supervision tree is described by a tree of specs before anything runs:
//! - [`ChildSpec`] - template for one worker leaf (name, policies, task body)
//! - [`SupervisorSpec`] - template for one supervisor (children, strategy, tolerance)
//! - [`Node`] - tagged variant tying the two together
//!
//! Specs are cheap to clone and re-used across restarts: every restart of a
//! slot re-spawns a fresh instance from the same spec.

mod child;
mod node;
mod supervisor;

pub use child::{ChildSpec, ChildSpecBuilder, ChildTag, Restart, Shutdown};
pub use node::Node;
pub use supervisor::{
    BuildNodesFn, CleanupFn, LifecycleHook, Order, Strategy, SupervisorSpec,
    SupervisorSpecBuilder, Tolerance,
};

pub(crate) use supervisor::ChildrenSource;

use crate::error::BuildError;

/// Runtime names are `/`-joined paths; declared names must not contain the
/// separator.
pub(crate) const PATH_SEPARATOR: char = '/';

pub(crate) fn validate_name(name: &str) -> Result<(), BuildError> {
    if name.is_empty() {
        return Err(BuildError::EmptyName);
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(BuildError::ReservedName { name: name.into() });
    }
    Ok(())
}
