//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] — the extension point for plugging custom event
//! handlers into the runtime.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Bounded queue** (configurable capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics caught, reported as `SubscriberPanicked` event)
//!
//! ## Rules
//! - Slow subscribers only affect themselves (queue overflow → event drop)
//! - Panics are **isolated** (do not crash the runtime or other subscribers)
//! - Subscribers **do not block** publishers or other subscribers
//! - Queue capacity is **per-subscriber** (not global)
//!
//! ## Overflow behavior
//! When a subscriber's queue is full:
//! 1. The event is **dropped** for this subscriber only
//! 2. A `SubscriberOverflow` event is published and the set's drop counter
//!    is incremented (for observability)
//! 3. Other subscribers are **unaffected**

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// Receives events from the runtime via a dedicated worker task with a
/// bounded queue.
///
/// ### Implementation requirements
/// - **Performance**: slow processing only affects this subscriber's queue
/// - **Async-friendly**: avoid blocking operations, use async I/O
/// - **Error handling**: handle errors internally, do not panic
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// ### Context
    /// - Called from a dedicated worker task (not the publisher)
    /// - Events are processed sequentially (FIFO order per subscriber)
    /// - Panics are caught and reported as `SubscriberPanicked`
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name for logging and diagnostics.
    ///
    /// Used in `SubscriberOverflow` and `SubscriberPanicked` events.
    /// Keep short and descriptive (e.g., "metrics", "audit", "slack").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber.
    ///
    /// Defaults to 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
