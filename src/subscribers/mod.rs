//! # Event subscribers for the supervision runtime.
//!
//! This module provides the [`Subscribe`] trait and the non-blocking
//! fan-out machinery delivering lifecycle events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   supervisors ── publish(Event) ──► Bus ──► pump ──► SubscriberSet
//!                                                          │
//!                                            ┌─────────────┼─────────────┐
//!                                            ▼             ▼             ▼
//!                                       [queue 1]     [queue 2]     [queue N]
//!                                            │             │             │
//!                                        worker 1      worker 2      worker N
//!                                            ▼             ▼             ▼
//!                                       LogWriter      Metrics       Custom
//! ```
//!
//! ## Rules
//! - Delivery is fire-and-forget: a slow or dead observer loses events, it
//!   never stalls a supervisor.
//! - Each subscriber has its own bounded queue and worker task; panics are
//!   isolated and reported.
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use taskwarden::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct MetricsSubscriber;
//!
//! #[async_trait]
//! impl Subscribe for MetricsSubscriber {
//!     async fn on_event(&self, event: &Event) {
//!         match event.kind {
//!             EventKind::Failed => {
//!                 // increment failure counter
//!             }
//!             _ => {}
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "metrics"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
