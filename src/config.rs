//! # Global runtime configuration.
//!
//! [`Config`] defines the plumbing shared by every tree a
//! [`Warden`](crate::Warden) spawns. Supervision behavior itself (strategy,
//! tolerance, shutdown budgets) lives on the specs, not here.
//!
//! # Example
//! ```
//! use taskwarden::Config;
//!
//! let mut cfg = Config::default();
//! cfg.bus_capacity = 4096;
//!
//! assert_eq!(cfg.bus_capacity, 4096);
//! ```

/// Configuration for the event delivery plumbing.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus ring. When exceeded, the oldest events are
    /// dropped for lagging consumers.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self { bus_capacity: 1024 }
    }
}
