//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] forwards events to the `log` crate in a terse
//! human-readable format. This is primarily useful for development,
//! debugging, and examples.
//!
//! ## Output format
//! ```text
//! [started] node=w1 runtime=root/w1
//! [failed] node=w1 runtime=root/w1 err="execution failed: boom"
//! [restarted] node=w1 runtime=root/w1
//! [terminated] node=w1 runtime=root/w1
//! [shutdown-requested]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Built-in `log`-backed subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Subscribe`] for structured logging or metrics
/// collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let node = e.node.as_deref().unwrap_or("-");
        let runtime = e.runtime_name.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::Started => {
                log::info!("[started] node={node} runtime={runtime}");
            }
            EventKind::Terminated => {
                log::info!("[terminated] node={node} runtime={runtime}");
            }
            EventKind::Restarted => {
                log::warn!(
                    "[restarted] node={node} runtime={runtime} restarts={:?}",
                    e.restarts
                );
            }
            EventKind::Failed => {
                log::error!(
                    "[failed] node={node} runtime={runtime} err={:?}",
                    e.error.as_deref().unwrap_or("-")
                );
            }
            EventKind::ShutdownRequested => {
                log::info!("[shutdown-requested]");
            }
            EventKind::SubscriberOverflow => {
                log::warn!("[subscriber-overflow] {:?}", e.error);
            }
            EventKind::SubscriberPanicked => {
                log::error!("[subscriber-panicked] node={node} info={:?}", e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
