//! Child termination notifications.
//!
//! Every child instance owns the write half of its parent's inbound channel
//! and sends exactly one [`ChildNotification`] when it terminates. The
//! parent supervisor is the single consumer; it serializes notifications
//! with its other inputs (commands, cancellation) in one select loop.

use crate::error::ChildError;

/// Reports that a child instance has terminated. If it terminated with an
/// error, the error is set; otherwise the exit was clean.
#[derive(Debug, Clone)]
pub(crate) struct ChildNotification {
    /// Declared name of the child that emitted this notification.
    pub(crate) name: String,
    /// Path-qualified runtime name of the child instance.
    pub(crate) runtime_name: String,
    /// Spawn generation of the instance. Guards against notifications from
    /// replaced instances being attributed to the current one.
    pub(crate) generation: u64,
    /// Terminal error, if any.
    pub(crate) error: Option<ChildError>,
}
