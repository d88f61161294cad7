//! Runtime core: the supervision engine.
//!
//! This module contains the embedded implementation of the supervision
//! tree. The public API re-exported from here is [`Warden`], [`RootHandle`],
//! and the dynamic-management handles; everything else is an internal
//! building block the supervisors wire together.
//!
//! ## Files & responsibilities
//! - **root.rs**: public facade; owns Bus + SubscriberSet, spawns root
//!   supervisors, exposes stop/wait/signal handling.
//! - **supervisor.rs**: the per-supervisor state machine: ordered start with
//!   ack waits and rollback, the single-consumer select loop, strategy
//!   acted-on-set restarts, tolerance escalation, ordered teardown.
//! - **child.rs**: spawning one instance of a node (worker body or subtree
//!   runtime) with the ack / done / notification protocol and panic capture.
//! - **window.rs**: sliding-window restart accountant.
//! - **notification.rs**: the child termination record.
//! - **handle.rs**: `Spawner` trait and the command/stop handles.
//!
//! ## Wiring (module-level flow)
//! ```text
//! Application code
//!   └─ builds specs, creates Warden, calls Warden::spawn(spec)
//!
//! Warden::spawn()
//!   ├─ spawns SupervisorRuntime::run as a task
//!   └─ awaits the root's start ack ──► RootHandle
//!
//! SupervisorRuntime::run()  (one task per supervisor)
//!   ├─ start children in order, awaiting each ack (rollback on failure)
//!   └─ loop select:
//!        ├─ cancellation        → terminate children (reverse), hooks, exit
//!        ├─ child notification  → restart policy → acted-on set procedure
//!        │                        (stop reverse, start forward, account
//!        │                        restarts; escalate when tolerance trips)
//!        └─ command             → dynamic spawn / stop
//!
//! child::spawn()  (one task per child instance)
//!   ├─ worker: runs the task body; subtree: runs a nested SupervisorRuntime
//!   ├─ ack (oneshot)  → parent's start_child
//!   ├─ done (oneshot) → parent's wait() during deliberate stops
//!   └─ notification (unbounded mpsc) → parent's select loop
//! ```
//!
//! ## Shutdown timeline
//! ```text
//! RootHandle::stop() → cancel root token
//! → root supervisor: stop children in reverse order, each under its
//!   shutdown budget (subtrees recurse with budget Infinity by default)
//! → cleanup callback, on_terminate hook
//! → stop() returns Ok or the aggregated TerminationError
//! ```
//!
//! ## Notes
//! - Event ordering is maintained via a global monotonic sequence number.
//! - Event delivery is fire-and-forget (bounded broadcast + per-subscriber
//!   mpsc queues).
//! - One supervisor never holds locks; its task owns all its state.

mod child;
mod handle;
mod notification;
mod root;
mod supervisor;
mod window;

pub use handle::{ChildHandle, Spawner, SupervisorHandle};
pub use root::{RootHandle, Warden};
