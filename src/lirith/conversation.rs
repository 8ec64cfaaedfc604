//! Agents and the per-agent message history an experiment accumulates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_temperature() -> f32 {
    0.9
}

/// A persona taking part in the experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique within an experiment.
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Fixed persona declaration ("DNA") injected into the system context.
    #[serde(default)]
    pub dna: Option<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Agent {
            name: name.into(),
            temperature: default_temperature(),
            dna: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_dna(mut self, dna: impl Into<String>) -> Self {
        self.dna = Some(dna.into());
        self
    }
}

/// Each agent's own prior messages, oldest first.
///
/// Only grows during a run. Agent order is the order agents were registered.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    order: Vec<String>,
    histories: HashMap<String, Vec<String>>,
}

impl ConversationState {
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = ConversationState::default();
        for agent in agents {
            state.register(agent.into());
        }
        state
    }

    fn register(&mut self, agent: String) {
        if !self.histories.contains_key(&agent) {
            self.histories.insert(agent.clone(), Vec::new());
            self.order.push(agent);
        }
    }

    pub fn agents(&self) -> &[String] {
        &self.order
    }

    pub fn history(&self, agent: &str) -> &[String] {
        self.histories.get(agent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, agent: &str) -> Option<&str> {
        self.history(agent).last().map(String::as_str)
    }

    /// Record a successful response. Unknown agents are registered on first append.
    pub fn append(&mut self, agent: &str, message: impl Into<String>) {
        self.register(agent.to_string());
        if let Some(history) = self.histories.get_mut(agent) {
            history.push(message.into());
        }
    }

    /// Every agent except `speaker`, in registration order, with their latest message.
    pub fn others<'a>(&'a self, speaker: &'a str) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        self.order
            .iter()
            .filter(move |name| name.as_str() != speaker)
            .map(move |name| (name.as_str(), self.latest(name)))
    }

    pub fn total_messages(&self) -> usize {
        self.histories.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tracks_appends() {
        let mut state = ConversationState::new(["Echoel", "Lumen"]);
        assert_eq!(state.latest("Echoel"), None);
        state.append("Echoel", "첫 번째");
        state.append("Echoel", "두 번째");
        assert_eq!(state.latest("Echoel"), Some("두 번째"));
        assert_eq!(state.history("Echoel").len(), 2);
        assert_eq!(state.total_messages(), 2);
    }

    #[test]
    fn others_excludes_speaker_in_order() {
        let mut state = ConversationState::new(["A", "B", "C"]);
        state.append("C", "hello");
        let others: Vec<_> = state.others("B").collect();
        assert_eq!(others, vec![("A", None), ("C", Some("hello"))]);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let state = ConversationState::new(["A", "A", "B"]);
        assert_eq!(state.agents(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn agent_builder() {
        let agent = Agent::new("Saira").with_temperature(1.05).with_dna("나는 흔들린다");
        assert_eq!(agent.temperature, 1.05);
        assert_eq!(agent.dna.as_deref(), Some("나는 흔들린다"));
        assert_eq!(Agent::new("x").temperature, 0.9);
    }
}
