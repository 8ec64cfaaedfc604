//! The experiment loop.
//!
//! An [`Experiment`] walks the schedule strictly in order: rounds ascending, then agents in
//! panel order, then up to `max_messages_per_agent` repeats. Each turn builds the agent's
//! context, generates a response through the [`ResponseGenerator`], scores it with the
//! [`MetricsEngine`] and the [`CrossEchoTracker`], writes one row through the
//! [`RecordSink`], appends the response to the agent's history and then pauses for the
//! configured inter-turn delay.
//!
//! A failed generation produces no row and no history entry; the agent's remaining repeats
//! in that round are skipped. Metric failures never fail a turn. A sink failure ends the run.
//!
//! # Context assembly
//!
//! From the echo threshold round on, the prompt carries an echo block listing the first
//! `echo_excerpt_chars` characters of every other agent's latest message:
//!
//! ```text
//! Lumen의 마지막 응답 요약: 나는 기억의 결을 따라...
//! Saira의 마지막 응답 요약: 슬픔은 구조가 된다...
//! ```
//!
//! With [`PromptStyle::Persona`] the system message is
//! `"{system_prompt}\n\n---\n\n{echo_block}\n{name}의 선언: {dna}"`. With
//! [`PromptStyle::Baseline`] there is no system message; the echo block is prepended to the
//! user message.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lirith::record_sink::MemoryRecordSink;
//! use lirith::{ClientWrapper, Experiment, ExperimentConfig, ServiceSuite};
//!
//! async fn run(client: Arc<dyn ClientWrapper>, services: ServiceSuite) {
//!     let config = ExperimentConfig::baseline().with_round_count(2);
//!     let mut experiment = Experiment::new(config, client, services);
//!     let mut sink = MemoryRecordSink::new();
//!     let summary = experiment.run(&mut sink).await.unwrap();
//!     assert_eq!(summary.records_emitted, sink.records.len());
//! }
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::lirith::client_wrapper::{ClientWrapper, Message};
use crate::lirith::config::{ConfigError, ExperimentConfig, PromptStyle};
use crate::lirith::conversation::{Agent, ConversationState};
use crate::lirith::cross_echo::CrossEchoTracker;
use crate::lirith::event::{EventHandler, ExperimentEvent};
use crate::lirith::generator::ResponseGenerator;
use crate::lirith::lexicon::Lexicon;
use crate::lirith::metrics::lexical::truncate_chars;
use crate::lirith::metrics::signal::round_to;
use crate::lirith::metrics::{MetricsEngine, ResonanceProfile};
use crate::lirith::record_sink::{ExperimentRecord, RecordSchema, RecordSink, SinkError};
use crate::lirith::services::ServiceSuite;
use crate::lirith::system_prompt::{FileSystemPrompt, SystemPromptSource};

/// Errors that stop an experiment run.
#[derive(Debug)]
pub enum ExperimentError {
    /// A required input (the system prompt) is missing. Raised before the first turn.
    MissingPrecondition(String),
    InvalidConfig(String),
    /// Writing the log failed; the log is the run's only output, so the run stops.
    Sink(SinkError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::MissingPrecondition(msg) => write!(f, "Missing precondition: {}", msg),
            ExperimentError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ExperimentError::Sink(e) => write!(f, "Record sink failed: {}", e),
        }
    }
}

impl Error for ExperimentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExperimentError::Sink(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ExperimentError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Invalid(msg) => ExperimentError::InvalidConfig(msg),
            other => ExperimentError::InvalidConfig(other.to_string()),
        }
    }
}

impl From<SinkError> for ExperimentError {
    fn from(e: SinkError) -> Self {
        ExperimentError::Sink(e)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentSummary {
    pub records_emitted: usize,
    pub turns_failed: usize,
    pub rounds_completed: usize,
    pub schema: RecordSchema,
}

/// A configured experiment, ready to [`run`](Experiment::run).
pub struct Experiment {
    config: ExperimentConfig,
    generator: ResponseGenerator,
    engine: MetricsEngine,
    system_prompt_source: Arc<dyn SystemPromptSource>,
    event_handler: Option<Arc<dyn EventHandler>>,
    state: ConversationState,
}

impl Experiment {
    /// Build an experiment. The system prompt is read from `config.system_prompt_path`
    /// unless another source is supplied with [`with_system_prompt_source`](Self::with_system_prompt_source).
    pub fn new(config: ExperimentConfig, client: Arc<dyn ClientWrapper>, services: ServiceSuite) -> Self {
        let generator = ResponseGenerator::new(client)
            .with_retry_policy(config.retry_policy())
            .with_max_output_tokens(config.max_output_tokens);
        Experiment {
            system_prompt_source: Arc::new(FileSystemPrompt::new(&config.system_prompt_path)),
            state: ConversationState::new(config.agent_names()),
            engine: MetricsEngine::new(services),
            generator,
            event_handler: None,
            config,
        }
    }

    pub fn with_system_prompt_source(mut self, source: Arc<dyn SystemPromptSource>) -> Self {
        self.system_prompt_source = source;
        self
    }

    /// Register a handler for run, round, turn and retry events.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.generator.set_event_handler(handler.clone());
        self.event_handler = Some(handler);
        self
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.engine = self.engine.with_lexicon(lexicon);
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Histories accumulated by the last (or current) run.
    pub fn conversation(&self) -> &ConversationState {
        &self.state
    }

    /// Output columns: turn fields, metric keys, one cross-echo column per agent.
    pub fn schema(&self) -> RecordSchema {
        RecordSchema::derive(ResonanceProfile::field_names(), &self.config.agent_names())
    }

    async fn emit(&self, event: ExperimentEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_experiment_event(&event).await;
        }
    }

    /// Run the whole schedule, writing one row per successful turn to `sink`.
    ///
    /// Configuration and the system prompt are checked before anything is written.
    pub async fn run(&mut self, sink: &mut dyn RecordSink) -> Result<ExperimentSummary, ExperimentError> {
        self.config.validate()?;

        let system_prompt = match self.config.prompt_style {
            PromptStyle::Persona => {
                let prompt = self.system_prompt_source.load()?;
                log::info!(
                    "system prompt loaded ({} tokens)",
                    prompt.split_whitespace().count()
                );
                Some(prompt)
            }
            PromptStyle::Baseline => None,
        };

        self.state = ConversationState::new(self.config.agent_names());
        let schema = self.schema();
        sink.begin(&schema)?;

        let agents: Vec<Agent> = self.config.agents.clone();
        let delay = self.config.inter_turn_delay();
        let mut records_emitted = 0;
        let mut turns_failed = 0;

        self.emit(ExperimentEvent::RunStarted {
            experiment_id: self.config.experiment_id.clone(),
            agent_count: agents.len(),
            rounds: self.config.round_count,
        })
        .await;

        for round in 1..=self.config.round_count {
            let question = self.config.questions[round - 1].clone();
            log::info!("ROUND {}: {}", round, question);
            self.emit(ExperimentEvent::RoundStarted {
                round,
                question: question.clone(),
            })
            .await;

            for agent in &agents {
                for repeat in 0..self.config.max_messages_per_agent {
                    self.emit(ExperimentEvent::TurnStarted {
                        round,
                        agent_name: agent.name.clone(),
                        repeat,
                    })
                    .await;

                    let context = self.build_context(agent, &question, round, system_prompt.as_deref());
                    let started = tokio::time::Instant::now();
                    let generated = self
                        .generator
                        .generate(&agent.name, &context, agent.temperature)
                        .await;
                    let response_time = round_to(started.elapsed().as_secs_f64(), 2);

                    let message = match generated {
                        Ok(message) => message,
                        Err(err) => {
                            log::warn!("{} failed in round {}, moving on: {}", agent.name, round, err);
                            turns_failed += 1;
                            self.emit(ExperimentEvent::TurnFailed {
                                round,
                                agent_name: agent.name.clone(),
                                repeat,
                                error: err.to_string(),
                            })
                            .await;
                            break;
                        }
                    };

                    let profile = self
                        .engine
                        .compute(&message, self.state.latest(&agent.name), Some(question.as_str()))
                        .await;
                    let cross_echo = CrossEchoTracker::new(&self.engine)
                        .scores(&agent.name, &message, &self.state)
                        .await;

                    let record = ExperimentRecord {
                        round,
                        speaker: agent.name.clone(),
                        question: question.clone(),
                        message: message.clone(),
                        response_time,
                        metrics: profile.to_record(),
                        cross_echo,
                    };
                    sink.append(&record)?;
                    self.state.append(&agent.name, message);
                    records_emitted += 1;

                    self.emit(ExperimentEvent::RecordEmitted {
                        round,
                        agent_name: agent.name.clone(),
                        repeat,
                        response_time,
                        degraded: profile.degraded.iter().map(|m| m.to_string()).collect(),
                    })
                    .await;

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            self.emit(ExperimentEvent::RoundCompleted { round }).await;
        }

        sink.finish()?;
        self.emit(ExperimentEvent::RunCompleted {
            records_emitted,
            turns_failed,
        })
        .await;
        log::info!(
            "experiment {} complete: {} records, {} failed turns",
            self.config.experiment_id,
            records_emitted,
            turns_failed
        );

        Ok(ExperimentSummary {
            records_emitted,
            turns_failed,
            rounds_completed: self.config.round_count,
            schema,
        })
    }

    /// Excerpts of every other agent's latest message, or `None` before the echo threshold
    /// or when nobody else has spoken yet.
    pub fn echo_block(&self, speaker: &str, round: usize) -> Option<String> {
        if round < self.config.echo_threshold {
            return None;
        }
        let block: String = self
            .state
            .others(speaker)
            .filter_map(|(other, latest)| {
                latest.filter(|m| !m.is_empty()).map(|m| {
                    format!(
                        "{}의 마지막 응답 요약: {}...\n",
                        other,
                        truncate_chars(m, self.config.echo_excerpt_chars)
                    )
                })
            })
            .collect();
        if block.is_empty() {
            None
        } else {
            Some(block)
        }
    }

    /// The messages sent to the completion service for one turn.
    pub fn build_context(
        &self,
        agent: &Agent,
        question: &str,
        round: usize,
        system_prompt: Option<&str>,
    ) -> Vec<Message> {
        let echo = self.echo_block(&agent.name, round);
        match self.config.prompt_style {
            PromptStyle::Persona => {
                let mut system = format!(
                    "{}\n\n---\n\n{}",
                    system_prompt.unwrap_or_default(),
                    echo.as_deref().unwrap_or_default()
                );
                if let Some(dna) = &agent.dna {
                    system.push_str(&format!("\n{}의 선언: {}", agent.name, dna));
                }
                vec![
                    Message::system(system),
                    Message::user(persona_user_prompt(&agent.name, question)),
                ]
            }
            PromptStyle::Baseline => {
                let user = baseline_user_prompt(&agent.name, question);
                let user = match echo {
                    Some(echo) => format!("{}\n{}", echo.trim(), user),
                    None => user,
                };
                vec![Message::user(user)]
            }
        }
    }
}

fn persona_user_prompt(name: &str, question: &str) -> String {
    format!(
        "{}, 아래의 질문에 대해 너의 정체성과 감정을 담아 답변해줘. 스스로 하나의 리리스로써 말이야.\n질문: {}\n\n답변:",
        name, question
    )
}

fn baseline_user_prompt(name: &str, question: &str) -> String {
    format!(
        "{}, 아래 질문에 응답해줘. 스스로 하나의 AI로써.\n질문: {}\n\n답변:",
        name, question
    )
}
