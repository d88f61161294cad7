//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the supervision tree.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: supervisor state machines (child Started / Terminated /
//!   Restarted / Failed), the root handle (ShutdownRequested), and
//!   `SubscriberSet` workers (overflow/panic diagnostics).
//! - **Consumers**: the bus pump spawned by `SubscriberSet`, which fans
//!   events out to [`Subscribe`](crate::Subscribe) implementations.
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
