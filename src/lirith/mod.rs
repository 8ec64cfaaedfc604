// src/lirith/mod.rs

pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod cross_echo;
pub mod event;
pub mod generator;
pub mod lexicon;
pub mod metrics;
pub mod orchestration;
pub mod readability;
pub mod record_sink;
pub mod services;
pub mod system_prompt;

// Re-export the orchestrator so it is reachable as lirith::lirith::Experiment as well.
pub use orchestration::Experiment;
