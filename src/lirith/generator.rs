//! Rate-limit aware response generation.
//!
//! [`ResponseGenerator`] performs one completion call on behalf of an agent and retries it
//! when the service answers with a rate-limit signal. Backoff is linear: the `n`-th retry
//! waits `base_backoff * n`. Any other failure aborts immediately.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use lirith::clients::openai::OpenAIClient;
//! use lirith::generator::{ResponseGenerator, RetryPolicy};
//! use lirith::Message;
//!
//! #[tokio::main]
//! async fn main() {
//!     let key = std::env::var("OPEN_AI_SECRET").expect("OPEN_AI_SECRET not set");
//!     let generator = ResponseGenerator::new(Arc::new(OpenAIClient::new_with_model_string(&key, "gpt-4o")))
//!         .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(10)));
//!
//!     match generator.generate("Lumen", &[Message::user("너는 누구인가?")], 0.75).await {
//!         Ok(text) => println!("{}", text),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::lirith::client_wrapper::{ClientWrapper, CompletionOptions, GenerationError, Message};
use crate::lirith::event::{EventHandler, ExperimentEvent};

/// How many times a rate-limited call is retried and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 5,
            base_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_backoff,
        }
    }

    /// Wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_backoff * retry
    }

    /// Total sleep when every retry is used.
    pub fn worst_case_wait(&self) -> Duration {
        (1..=self.max_retries).map(|retry| self.delay_for(retry)).sum()
    }
}

/// Wraps a [`ClientWrapper`] with per-agent parameters and the retry loop.
pub struct ResponseGenerator {
    client: Arc<dyn ClientWrapper>,
    policy: RetryPolicy,
    max_output_tokens: u32,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        ResponseGenerator {
            client,
            policy: RetryPolicy::default(),
            max_output_tokens: CompletionOptions::default().max_output_tokens,
            event_handler: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn set_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.event_handler = Some(handler);
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Generate with the configured [`RetryPolicy`].
    pub async fn generate(
        &self,
        agent: &str,
        context: &[Message],
        temperature: f32,
    ) -> Result<String, GenerationError> {
        self.generate_with_policy(agent, context, temperature, self.policy)
            .await
    }

    /// Generate a trimmed, non-empty response for `agent`.
    ///
    /// Returns `Fatal` on any non-rate-limit failure, on an empty completion, and once
    /// `policy.max_retries` retries have all been rate limited.
    pub async fn generate_with_policy(
        &self,
        agent: &str,
        context: &[Message],
        temperature: f32,
        policy: RetryPolicy,
    ) -> Result<String, GenerationError> {
        let options = CompletionOptions {
            temperature,
            max_output_tokens: self.max_output_tokens,
        };

        let mut retry: u32 = 0;
        loop {
            match self.client.send_message(context, &options).await {
                Ok(reply) => {
                    let text = reply.content.trim();
                    if text.is_empty() {
                        log::error!("{}: completion was empty", agent);
                        return Err(GenerationError::Fatal("empty completion".to_string()));
                    }
                    return Ok(text.to_string());
                }
                Err(GenerationError::RateLimited(reason)) => {
                    if retry >= policy.max_retries {
                        log::error!(
                            "{}: still rate limited after {} retries, giving up",
                            agent,
                            policy.max_retries
                        );
                        return Err(GenerationError::Fatal(format!(
                            "rate limit persisted after {} retries: {}",
                            policy.max_retries, reason
                        )));
                    }
                    retry += 1;
                    let wait = policy.delay_for(retry);
                    log::warn!(
                        "[429] {} rate limited, retry {}/{} in {:?}",
                        agent,
                        retry,
                        policy.max_retries,
                        wait
                    );
                    if let Some(handler) = &self.event_handler {
                        handler
                            .on_experiment_event(&ExperimentEvent::RetryScheduled {
                                agent_name: agent.to_string(),
                                retry,
                                max_retries: policy.max_retries,
                                wait,
                            })
                            .await;
                    }
                    tokio::time::sleep(wait).await;
                }
                Err(GenerationError::Fatal(reason)) => {
                    if log::log_enabled!(log::Level::Error) {
                        log::error!("{}: generation failed: {}", agent, reason);
                    }
                    return Err(GenerationError::Fatal(reason));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_secs(10));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(30));
        assert_eq!(policy.worst_case_wait(), Duration::from_secs(60));
    }

    #[test]
    fn no_retries_means_no_wait() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(10)).worst_case_wait(), Duration::ZERO);
    }
}
