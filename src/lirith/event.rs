//! Experiment progress events.
//!
//! Implement [`EventHandler`] to follow a run as it happens: run and round boundaries,
//! every turn, rate-limit retries and emitted records. The single method has a default
//! no-op implementation, so a handler only matches the variants it cares about.
//!
//! Register a handler with [`Experiment::with_event_handler`](crate::Experiment::with_event_handler);
//! the experiment forwards it to its [`ResponseGenerator`](crate::ResponseGenerator) so retry
//! events reach the same handler.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lirith::event::{EventHandler, ExperimentEvent};
//!
//! struct Progress;
//!
//! #[async_trait]
//! impl EventHandler for Progress {
//!     async fn on_experiment_event(&self, event: &ExperimentEvent) {
//!         match event {
//!             ExperimentEvent::RoundStarted { round, question } => {
//!                 println!("=== ROUND {}: {}", round, question);
//!             }
//!             ExperimentEvent::RecordEmitted { agent_name, response_time, .. } => {
//!                 println!("{} answered in {:.2}s", agent_name, response_time);
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::time::Duration;

/// Events emitted by an [`Experiment`](crate::Experiment) and its generator.
///
/// # Event Flow
///
/// ```text
/// RunStarted
///   └─ RoundStarted { round: 1 }
///       └─ TurnStarted { agent, repeat: 0 }
///           └─ (RetryScheduled)*
///           └─ RecordEmitted | TurnFailed
///       └─ ...
///   └─ RoundCompleted { round: 1 }
/// RunCompleted
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    RunStarted {
        experiment_id: String,
        agent_count: usize,
        rounds: usize,
    },
    RoundStarted {
        round: usize,
        question: String,
    },
    TurnStarted {
        round: usize,
        agent_name: String,
        repeat: usize,
    },
    /// The completion service rate limited the call; the generator sleeps `wait` and retries.
    RetryScheduled {
        agent_name: String,
        retry: u32,
        max_retries: u32,
        wait: Duration,
    },
    /// Generation failed; remaining repeats for this agent in this round are skipped.
    TurnFailed {
        round: usize,
        agent_name: String,
        repeat: usize,
        error: String,
    },
    RecordEmitted {
        round: usize,
        agent_name: String,
        repeat: usize,
        response_time: f64,
        /// Metrics that fell back to their defaults for this record.
        degraded: Vec<String>,
    },
    RoundCompleted {
        round: usize,
    },
    RunCompleted {
        records_emitted: usize,
        turns_failed: usize,
    },
}

/// Receives [`ExperimentEvent`]s.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_experiment_event(&self, _event: &ExperimentEvent) {}
}

/// Writes every event to the `log` facade at `info` level (retries and failures at `warn`).
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn on_experiment_event(&self, event: &ExperimentEvent) {
        match event {
            ExperimentEvent::RunStarted {
                experiment_id,
                agent_count,
                rounds,
            } => log::info!(
                "experiment {} started: {} agents, {} rounds",
                experiment_id,
                agent_count,
                rounds
            ),
            ExperimentEvent::RoundStarted { round, question } => {
                log::info!("=== ROUND {}: {}", round, question)
            }
            ExperimentEvent::TurnStarted {
                agent_name, repeat, ..
            } => log::info!("{} speaking (message {})", agent_name, repeat + 1),
            ExperimentEvent::RetryScheduled {
                agent_name,
                retry,
                max_retries,
                wait,
            } => log::warn!(
                "{} rate limited, retry {}/{} after {:?}",
                agent_name,
                retry,
                max_retries,
                wait
            ),
            ExperimentEvent::TurnFailed {
                agent_name, error, ..
            } => log::warn!("{} turn abandoned: {}", agent_name, error),
            ExperimentEvent::RecordEmitted {
                agent_name,
                response_time,
                degraded,
                ..
            } => {
                if degraded.is_empty() {
                    log::info!("{} recorded ({:.2}s)", agent_name, response_time)
                } else {
                    log::info!(
                        "{} recorded ({:.2}s, degraded: {})",
                        agent_name,
                        response_time,
                        degraded.join(", ")
                    )
                }
            }
            ExperimentEvent::RoundCompleted { round } => log::info!("round {} complete", round),
            ExperimentEvent::RunCompleted {
                records_emitted,
                turns_failed,
            } => log::info!(
                "experiment complete: {} records, {} failed turns",
                records_emitted,
                turns_failed
            ),
        }
    }
}
