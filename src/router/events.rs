//! Observability hook for router state transitions.

use serde::Serialize;
use serde_json::Value;

use super::Termination;

/// Transition reported by the router while a run progresses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouterEvent {
    /// A backend query is about to be issued for `agent`.
    TurnStarted { turn: usize, agent: String },
    /// The backend answered; `requested` lists operation names in order.
    BackendResponded {
        turn: usize,
        agent: String,
        requested: Vec<String>,
        has_text: bool,
    },
    /// A capability function is being invoked.
    CapabilityCalled {
        agent: String,
        operation: String,
        args: Value,
    },
    /// A capability function returned (`failed` when it reported a failure value).
    CapabilityFinished {
        agent: String,
        operation: String,
        failed: bool,
    },
    /// The active agent changed.
    Handoff {
        from: String,
        to: String,
        operation: String,
        reason: Option<String>,
    },
    /// The run ended without a router error.
    Terminated {
        agent: String,
        termination: Termination,
        turns: usize,
    },
}

/// Receives every [`RouterEvent`]. Must not block.
pub trait RouterObserver: Send + Sync {
    fn on_event(&self, event: &RouterEvent);
}

/// Emits events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RouterObserver for TracingObserver {
    fn on_event(&self, event: &RouterEvent) {
        match event {
            RouterEvent::TurnStarted { turn, agent } => {
                tracing::debug!("Router turn {} with agent {}", turn, agent);
            }
            RouterEvent::BackendResponded {
                turn,
                agent,
                requested,
                has_text,
            } => {
                tracing::debug!(
                    turn,
                    agent = %agent,
                    has_text,
                    "Backend requested {} operation(s): {}",
                    requested.len(),
                    requested.join(", ")
                );
            }
            RouterEvent::CapabilityCalled {
                agent,
                operation,
                args,
            } => {
                tracing::info!("{} calling {} with args: {}", agent, operation, args);
            }
            RouterEvent::CapabilityFinished {
                agent,
                operation,
                failed,
            } => {
                if *failed {
                    tracing::warn!("{} call to {} reported a failure", agent, operation);
                } else {
                    tracing::debug!("{} call to {} succeeded", agent, operation);
                }
            }
            RouterEvent::Handoff {
                from,
                to,
                operation,
                reason,
            } => {
                tracing::info!(
                    operation = %operation,
                    reason = reason.as_deref().unwrap_or(""),
                    "Routing from {} to {}",
                    from,
                    to
                );
            }
            RouterEvent::Terminated {
                agent,
                termination,
                turns,
            } => match termination {
                Termination::Completed => {
                    tracing::info!("Run completed by {} after {} turn(s)", agent, turns);
                }
                other => {
                    tracing::warn!("Run ended as {:?} with {} after {} turn(s)", other, agent, turns);
                }
            },
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RouterObserver for NoopObserver {
    fn on_event(&self, _event: &RouterEvent) {}
}
