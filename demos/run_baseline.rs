//! Zero-DNA Baseline
//!
//! The control run for `run_experiment`: the same schedule and temperatures, but the agents
//! get no shared system prompt and no persona declaration. Echo blocks are prepended to the
//! user prompt. Rows go to `experiment_zeroDNA_log_<timestamp>.csv`.
//!
//! export OPEN_AI_SECRET=your_openai_key
//! export HF_API_TOKEN=your_huggingface_token
//!
//! Then run: cargo run --example run_baseline

use lirith::clients::huggingface::HuggingFaceClassifier;
use lirith::clients::languagetool::LanguageToolClient;
use lirith::clients::openai::{Model, OpenAIClient, OpenAIEmbeddingClient};
use lirith::event::LoggingEventHandler;
use lirith::record_sink::CsvRecordSink;
use lirith::services::ServiceSuite;
use lirith::{Experiment, ExperimentConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    lirith::init_logger();

    let openai_key = std::env::var("OPEN_AI_SECRET")?;
    let hf_token = std::env::var("HF_API_TOKEN")?;

    let config = ExperimentConfig::baseline();
    let client = Arc::new(OpenAIClient::new_with_model_enum(&openai_key, Model::GPT4o));
    let services = ServiceSuite::new(
        Arc::new(OpenAIEmbeddingClient::new(&openai_key)),
        Arc::new(HuggingFaceClassifier::emotion(&hf_token)),
        Arc::new(HuggingFaceClassifier::entailment(&hf_token)),
        Arc::new(LanguageToolClient::public()),
    );

    let output = config.output_filename(chrono::Local::now());
    let mut sink = CsvRecordSink::create(&output)?;

    let mut experiment = Experiment::new(config, client, services)
        .with_event_handler(Arc::new(LoggingEventHandler));
    let summary = experiment.run(&mut sink).await?;

    println!(
        "Baseline finished: {} records ({} failed turns) in {}",
        summary.records_emitted,
        summary.turns_failed,
        output.display()
    );
    Ok(())
}
