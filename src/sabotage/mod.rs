//! # Fault-injection harness.
//!
//! A pure client of the engine's public API for exercising trees under
//! failure: it owns no supervision state and drives everything through a
//! [`Spawner`](crate::Spawner).
//!
//! ## Pieces
//! - [`SabotageDb`] — a cloneable client over an internal command channel,
//!   holding sabotage *plans* (named failure schedules against a target
//!   saboteur).
//! - `SabotageDb::node` — the state loop as a supervised worker; its state
//!   survives restarts of the loop.
//! - `SabotageDb::saboteur` — a worker spec that registers a failure
//!   signaler on each start and fails with the injected reason when
//!   signaled.
//! - Plan workers — Temporary children spawned through the `Spawner`, each
//!   injecting a bounded number of failures on a schedule.
//!
//! ## Wiring order
//! Saboteur workers register with the state loop during their own start, so
//! the [`SabotageDb::node`] worker must be running before any saboteur
//! starts. Spawn it first.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taskwarden::sabotage::SabotageDb;
//! use taskwarden::{Config, Spawner, SupervisorSpec, Warden};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SabotageDb::new();
//!
//! let warden = Warden::new(Config::default(), Vec::new());
//! let root = warden.spawn(SupervisorSpec::builder("root").build()?).await?;
//!
//! // State loop first, then the saboteur it will serve.
//! let spawner: Arc<dyn Spawner> = Arc::new(root.spawner());
//! spawner.spawn(db.node(Arc::clone(&spawner))?).await?;
//! spawner.spawn(db.saboteur("victim", "victim")?.into()).await?;
//!
//! db.insert_plan("p1", "victim", Duration::ZERO, Duration::from_secs(1), 3)
//!     .await?;
//! db.start_plan("p1").await?;
//! # Ok(())
//! # }
//! ```

mod db;
mod plan;

pub use db::{SabotageDb, SabotageError};
