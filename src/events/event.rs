//! # Lifecycle events emitted by the supervision tree.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Node lifecycle**: a child started, terminated, restarted, or failed
//! - **Tree control**: shutdown requested by an OS signal
//! - **Delivery diagnostics**: subscriber overflow and panic reports
//!
//! The [`Event`] struct carries the node's declared name, its path-qualified
//! runtime name, timestamps, and an error message when the event represents
//! a failure.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. This guarantees that events can be ordered correctly even
//! when delivered out-of-order through async channels.
//!
//! ## Example
//! ```rust
//! use taskwarden::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::Failed)
//!     .with_node("worker-a")
//!     .with_runtime_name("root/worker-a")
//!     .with_error("boom");
//!
//! assert_eq!(ev.kind, EventKind::Failed);
//! assert_eq!(ev.node.as_deref(), Some("worker-a"));
//! assert_eq!(ev.error.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Node lifecycle events ===
    /// A node started and acknowledged readiness.
    Started,
    /// A node stopped, either deliberately or by finishing cleanly.
    Terminated,
    /// A node was restarted after a failure (follows its `Started`).
    Restarted,
    /// A node failed: it terminated with an error, failed to start, or
    /// failed to stop within its shutdown budget.
    Failed,

    // === Tree control events ===
    /// Shutdown requested (OS signal received).
    ShutdownRequested,

    // === Delivery diagnostics ===
    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,
    /// Subscriber panicked during event processing.
    SubscriberPanicked,
}

/// Lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    /// Used to determine event ordering across async boundaries.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Declared name of the node, if applicable.
    pub node: Option<String>,
    /// Path-qualified runtime name of the node, if applicable.
    pub runtime_name: Option<String>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Successful restarts of the slot so far (set on `Restarted`).
    pub restarts: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            node: None,
            runtime_name: None,
            error: None,
            restarts: None,
        }
    }

    /// Attaches the node's declared name.
    pub fn with_node(mut self, name: impl Into<String>) -> Self {
        self.node = Some(name.into());
        self
    }

    /// Attaches the node's path-qualified runtime name.
    pub fn with_runtime_name(mut self, name: impl Into<String>) -> Self {
        self.runtime_name = Some(name.into());
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches the slot's restart count.
    pub fn with_restarts(mut self, n: u32) -> Self {
        self.restarts = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    ///
    /// Emitted when a subscriber's queue is full and an event is dropped.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_error(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    ///
    /// Emitted when a subscriber panics during event processing.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_node(subscriber)
            .with_error(info)
    }

    pub(crate) fn is_subscriber_overflow(&self) -> bool {
        self.kind == EventKind::SubscriberOverflow
    }

    pub(crate) fn is_subscriber_panic(&self) -> bool {
        self.kind == EventKind::SubscriberPanicked
    }
}
