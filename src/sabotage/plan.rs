//! Sabotage plans and their worker bodies.

use std::time::Duration;

use tokio::select;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::BuildError;
use crate::specs::{ChildSpec, Node, Restart};

/// A named failure schedule against one registered saboteur.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub(crate) name: String,
    /// Registered saboteur this plan injects failures into.
    pub(crate) subtree: String,
    /// Delay before the first injection.
    pub(crate) duration: Duration,
    /// Interval between injections.
    pub(crate) period: Duration,
    /// Number of failures to inject.
    pub(crate) attempts: u32,
}

impl Plan {
    /// Builds the Temporary worker that executes this plan: it injects
    /// `attempts` failures into `signal`, one per `period`, then finishes
    /// for good.
    pub(crate) fn to_node(&self, signal: broadcast::Sender<String>) -> Result<Node, BuildError> {
        let plan_name = self.name.clone();
        let duration = self.duration;
        let period = self.period;
        let attempts = self.attempts;

        let spec = ChildSpec::builder(format!("plan-{}", self.name))
            .with_restart(Restart::Temporary)
            .build(move |ctx: CancellationToken| {
                let signal = signal.clone();
                let plan_name = plan_name.clone();
                async move {
                    select! {
                        _ = sleep(duration) => {}
                        _ = ctx.cancelled() => return Ok(()),
                    }

                    for attempt in 1..=attempts {
                        let _ = signal
                            .send(format!("sabotage plan '{plan_name}' attempt {attempt}"));
                        if attempt < attempts {
                            select! {
                                _ = sleep(period) => {}
                                _ = ctx.cancelled() => return Ok(()),
                            }
                        }
                    }
                    Ok(())
                }
            })?;

        Ok(Node::Worker(spec))
    }
}
