//! # taskwarden
//!
//! **Taskwarden** is a supervision-tree runtime for long-lived async tasks,
//! in the Erlang/OTP supervisor discipline: interior nodes are supervisors,
//! leaves are workers, failures restart bounded sets of siblings, and
//! everything tears down in reverse start order.
//!
//! ## Features
//!
//! | Area              | Description                                                        | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------------|---------------------------------------------|
//! | **Specs**         | Immutable templates for workers and supervisors.                   | [`ChildSpec`], [`SupervisorSpec`], [`Node`] |
//! | **Strategies**    | Sibling restart strategies and bounded restart tolerance.          | [`Strategy`], [`Tolerance`], [`Restart`]    |
//! | **Supervision**   | Ordered start, monitored children, ordered teardown.               | [`Warden`], [`RootHandle`]                  |
//! | **Dynamic trees** | Insert and stop children under a running supervisor.               | [`Spawner`], [`ChildHandle`]                |
//! | **Errors**        | Four-kind taxonomy with structured key/value projection.           | [`SupervisorError`], [`ErrorKvs`]           |
//! | **Events**        | Fire-and-forget lifecycle event stream for observers.              | [`Event`], [`Subscribe`]                    |
//! | **Fault injection** | Plan-driven failure harness built on the public API.             | [`sabotage::SabotageDb`]                    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber _(demo/reference only)_.
//!
//! ```no_run
//! use std::time::Duration;
//! use taskwarden::{ChildSpec, Config, Strategy, SupervisorSpec, TaskError, Warden};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A worker runs until its cancellation token fires.
//!     let ticker = ChildSpec::worker("ticker", |ctx| async move {
//!         while !ctx.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(250)).await;
//!         }
//!         Ok::<_, TaskError>(())
//!     })?;
//!
//!     let spec = SupervisorSpec::builder("root")
//!         .with_strategy(Strategy::OneForOne)
//!         .with_tolerance(3, Duration::from_secs(5))
//!         .with_child(ticker)
//!         .build()?;
//!
//!     let warden = Warden::new(Config::default(), Vec::new());
//!     let root = warden.spawn(spec).await?;
//!
//!     // ... the tree is running; stop it and collect the aggregated result.
//!     root.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod core;
mod error;
mod events;
mod specs;
mod subscribers;
mod tasks;

pub mod sabotage;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{ChildHandle, RootHandle, Spawner, SupervisorHandle, Warden};
pub use error::{
    BuildError, ChildError, ErrorKvs, RestartError, StartError, SupervisorError, TaskError,
    TerminationError, ToleranceExceeded,
};
pub use events::{Bus, Event, EventKind};
pub use specs::{
    BuildNodesFn, ChildSpec, ChildSpecBuilder, ChildTag, CleanupFn, LifecycleHook, Node, Order,
    Restart, Shutdown, Strategy, SupervisorSpec, SupervisorSpecBuilder, Tolerance,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, StartNotifier, Task, TaskFn, TaskRef};

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
