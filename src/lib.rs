//! # Lirith
//!
//! Lirith runs scripted multi-agent dialogue experiments. A fixed panel of persona agents
//! answers a shared sequence of questions over several rounds, a remote language model
//! generates every answer, and each answer is scored by a battery of linguistic and
//! psychometric metrics before being appended to a tabular log.
//!
//! The crate is layered the same way an experiment flows:
//!
//! * **Generation**: [`ClientWrapper`] implementations talk to a completion API, and the
//!   [`ResponseGenerator`] wraps them with a bounded, linear retry-with-backoff policy for
//!   rate-limit responses.
//! * **Scoring**: the [`MetricsEngine`] turns a message, the speaker's previous message and
//!   the round's question into a [`ResonanceProfile`]. Remote classifiers (embeddings,
//!   emotion, entailment, grammar) sit behind the traits in [`services`] and degrade to
//!   documented defaults when unavailable.
//! * **Cross-agent echo**: the [`CrossEchoTracker`] compares a new message against the latest
//!   message of every other agent.
//! * **Orchestration**: [`Experiment`] drives the round × speaker × repeat schedule and writes
//!   one row per successful turn through a [`RecordSink`].
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lirith::clients::huggingface::HuggingFaceClassifier;
//! use lirith::clients::languagetool::LanguageToolClient;
//! use lirith::clients::openai::{OpenAIClient, OpenAIEmbeddingClient};
//! use lirith::record_sink::CsvRecordSink;
//! use lirith::services::ServiceSuite;
//! use lirith::{Experiment, ExperimentConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     lirith::init_logger();
//!
//!     let openai_key = std::env::var("OPEN_AI_SECRET")?;
//!     let hf_token = std::env::var("HF_API_TOKEN")?;
//!     let config = ExperimentConfig::default();
//!
//!     let client = Arc::new(OpenAIClient::new_with_model_string(&openai_key, &config.model));
//!     let services = ServiceSuite::new(
//!         Arc::new(OpenAIEmbeddingClient::new(&openai_key)),
//!         Arc::new(HuggingFaceClassifier::emotion(&hf_token)),
//!         Arc::new(HuggingFaceClassifier::entailment(&hf_token)),
//!         Arc::new(LanguageToolClient::public()),
//!     );
//!
//!     let output = config.output_filename(chrono::Local::now());
//!     let mut sink = CsvRecordSink::create(&output)?;
//!     let mut experiment = Experiment::new(config, client, services);
//!     let summary = experiment.run(&mut sink).await?;
//!
//!     println!("{} records written to {}", summary.records_emitted, output.display());
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Experiment runs are long and mostly idle (rate-limit throttling), so progress is reported
/// through the `log` facade. Set `RUST_LOG=info` to follow rounds and speakers.
///
/// ```rust
/// lirith::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

pub mod lirith;

pub use lirith::client_wrapper;
pub use lirith::client_wrapper::{
    ClientWrapper, CompletionOptions, GenerationError, Message, Role, TokenUsage,
};
pub use lirith::clients;
pub use lirith::config;
pub use lirith::config::{ConfigError, ExperimentConfig, PromptStyle};
pub use lirith::conversation;
pub use lirith::conversation::{Agent, ConversationState};
pub use lirith::cross_echo;
pub use lirith::cross_echo::CrossEchoTracker;
pub use lirith::event;
pub use lirith::event::{EventHandler, ExperimentEvent};
pub use lirith::generator;
pub use lirith::generator::{ResponseGenerator, RetryPolicy};
pub use lirith::lexicon;
pub use lirith::lexicon::Lexicon;
pub use lirith::metrics;
pub use lirith::metrics::{MetricValue, MetricsEngine, MetricsRecord, ResonanceProfile};
pub use lirith::orchestration;
pub use lirith::orchestration::{Experiment, ExperimentError, ExperimentSummary};
pub use lirith::readability;
pub use lirith::record_sink;
pub use lirith::record_sink::{ExperimentRecord, RecordSchema, RecordSink, SinkError};
pub use lirith::services;
pub use lirith::services::{ClassifierUnavailable, ServiceSuite};
pub use lirith::system_prompt;
pub use lirith::system_prompt::{FileSystemPrompt, StaticSystemPrompt, SystemPromptSource};
