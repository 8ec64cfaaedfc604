//! Persona Panel Experiment
//!
//! Runs the reference four-agent Lirith panel: fifteen rounds, up to three answers per agent
//! per round, cross-agent echo from round 11, and a one-minute throttle after every turn.
//! Every answer is scored and appended to `experiment_log_<timestamp>.csv`.
//!
//! Required environment variables:
//! export OPEN_AI_SECRET=your_openai_key
//! export HF_API_TOKEN=your_huggingface_token
//! export LANGUAGETOOL_URL=http://localhost:8081 (optional, defaults to the public API)
//!
//! A `system_prompt.txt` must exist in the working directory (or at the path named by the
//! configuration). An optional JSON file overrides individual configuration fields:
//!
//! cargo run --example run_experiment -- config.json

use lirith::clients::huggingface::HuggingFaceClassifier;
use lirith::clients::languagetool::LanguageToolClient;
use lirith::clients::openai::{OpenAIClient, OpenAIEmbeddingClient};
use lirith::event::LoggingEventHandler;
use lirith::record_sink::CsvRecordSink;
use lirith::services::ServiceSuite;
use lirith::{Experiment, ExperimentConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    lirith::init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => ExperimentConfig::from_json_file(&path)?,
        None => ExperimentConfig::default(),
    };

    let openai_key = std::env::var("OPEN_AI_SECRET")?;
    let hf_token = std::env::var("HF_API_TOKEN")?;
    let grammar = match std::env::var("LANGUAGETOOL_URL") {
        Ok(url) => LanguageToolClient::new(&url),
        Err(_) => LanguageToolClient::public(),
    };

    let client = Arc::new(OpenAIClient::new_with_model_string(&openai_key, &config.model));
    let services = ServiceSuite::new(
        Arc::new(OpenAIEmbeddingClient::new(&openai_key)),
        Arc::new(HuggingFaceClassifier::emotion(&hf_token)),
        Arc::new(HuggingFaceClassifier::entailment(&hf_token)),
        Arc::new(grammar),
    );

    let output = config.output_filename(chrono::Local::now());
    let mut sink = CsvRecordSink::create(&output)?;

    println!("=== Lirith persona experiment ===");
    println!(
        "{} agents, {} rounds, writing to {}\n",
        config.agents.len(),
        config.round_count,
        output.display()
    );

    let mut experiment = Experiment::new(config, client, services)
        .with_event_handler(Arc::new(LoggingEventHandler));
    let summary = experiment.run(&mut sink).await?;

    println!(
        "Done: {} records, {} failed turns, {} rounds.",
        summary.records_emitted, summary.turns_failed, summary.rounds_completed
    );
    Ok(())
}
