//! Pairwise echo between a new message and every other agent's latest message.

use crate::lirith::conversation::ConversationState;
use crate::lirith::metrics::MetricsEngine;

/// Column prefix for cross-echo values in the output log.
pub const CROSS_ECHO_PREFIX: &str = "cross_echo_";

/// Output column name for the echo against `agent`.
pub fn column_name(agent: &str) -> String {
    format!("{}{}", CROSS_ECHO_PREFIX, agent)
}

/// Scores a speaker's message against the rest of the panel.
pub struct CrossEchoTracker<'a> {
    engine: &'a MetricsEngine,
}

impl<'a> CrossEchoTracker<'a> {
    pub fn new(engine: &'a MetricsEngine) -> Self {
        CrossEchoTracker { engine }
    }

    /// `agent → echo_residue_score(agent's latest, message)` for every agent other than
    /// `speaker`, in panel order. Agents that have not spoken, and failed comparisons, score `0.0`.
    pub async fn scores(
        &self,
        speaker: &str,
        message: &str,
        state: &ConversationState,
    ) -> Vec<(String, f64)> {
        let mut scores = Vec::new();
        for (agent, latest) in state.others(speaker) {
            let score = match self.engine.echo_residue_score(latest, message).await {
                Ok(score) => score,
                Err(err) => {
                    log::warn!("cross echo {} -> {} degraded to 0.0: {}", speaker, agent, err);
                    0.0
                }
            };
            scores.push((agent.to_string(), score));
        }
        scores
    }
}
