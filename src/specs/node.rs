//! Tagged node variant: the differences between workers and supervisors are
//! small (start body, event classification), so a closed enum beats a trait
//! hierarchy here.

use crate::specs::child::{ChildSpec, ChildTag, Restart, Shutdown};
use crate::specs::supervisor::SupervisorSpec;

/// One node of a supervision tree: either a worker leaf or a nested
/// supervisor.
#[derive(Clone)]
pub enum Node {
    /// A worker leaf.
    Worker(ChildSpec),
    /// A nested supervision tree.
    Supervisor(SupervisorSpec),
}

impl Node {
    /// Returns the declared name of the node.
    pub fn name(&self) -> &str {
        match self {
            Node::Worker(spec) => spec.name(),
            Node::Supervisor(spec) => spec.name(),
        }
    }

    /// Returns the kind of node.
    pub fn tag(&self) -> ChildTag {
        match self {
            Node::Worker(_) => ChildTag::Worker,
            Node::Supervisor(_) => ChildTag::Supervisor,
        }
    }

    /// Returns the restart policy of the node.
    pub fn restart(&self) -> Restart {
        match self {
            Node::Worker(spec) => spec.restart(),
            Node::Supervisor(spec) => spec.restart(),
        }
    }

    /// Returns the shutdown policy of the node.
    pub fn shutdown(&self) -> Shutdown {
        match self {
            Node::Worker(spec) => spec.shutdown(),
            Node::Supervisor(spec) => spec.shutdown(),
        }
    }
}

impl From<ChildSpec> for Node {
    fn from(spec: ChildSpec) -> Self {
        Node::Worker(spec)
    }
}

impl From<SupervisorSpec> for Node {
    fn from(spec: SupervisorSpec) -> Self {
        Node::Supervisor(spec)
    }
}
