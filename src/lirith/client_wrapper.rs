use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;

/// A ClientWrapper is a wrapper around a specific completion service.
/// It provides a common interface so the experiment never depends on a vendor SDK.
/// It does not keep track of the conversation; the orchestrator assembles the full
/// context for every call and the wrapper only performs the round-trip.
// src/lirith/client_wrapper.rs

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    // persona framing and echo context
    User,
    // the question addressed to the agent
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion style APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Represents a generic message to be sent to a completion service.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call sampling parameters.
///
/// Each agent carries its own temperature, so options travel with every request
/// instead of living on the client.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        CompletionOptions {
            temperature: 0.9,
            max_output_tokens: 650,
        }
    }
}

/// Failure of a single completion call.
///
/// `RateLimited` is the only retryable signal. Everything else (transport errors,
/// authentication, malformed payloads, exhausted retries) is `Fatal`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    RateLimited(String),
    Fatal(String),
}

impl GenerationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::RateLimited(reason) => write!(f, "Rate limited: {}", reason),
            GenerationError::Fatal(reason) => write!(f, "Generation failed: {}", reason),
        }
    }
}

impl Error for GenerationError {}

/// Trait defining the interface to interact with a completion service.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Identifier of the model this client targets.
    fn model_name(&self) -> &str;

    /// Send the full context and get the assistant's reply.
    /// - `messages`: system and user messages, in order.
    /// - `options`: temperature and output budget for this call.
    async fn send_message(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, GenerationError>;

    /// Hook to retrieve usage from the *last* send_message() call.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Wrappers that track TokenUsage override this with their own slot.
        None
    }
}
