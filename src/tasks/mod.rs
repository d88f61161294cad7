//! # Task abstractions.
//!
//! This module provides the core task-related types:
//! - [`Task`] - trait for implementing async cancelable tasks
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`StartNotifier`] - one-shot readiness acknowledgement

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, StartNotifier, Task, TaskRef};
pub use task_fn::TaskFn;
