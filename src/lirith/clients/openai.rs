//! OpenAI-backed clients: [`OpenAIClient`] implements [`ClientWrapper`] over the Chat
//! Completions API and [`OpenAIEmbeddingClient`] implements [`Embedder`] over the Embeddings API.
//!
//! Both talk to the REST endpoints directly through the shared `reqwest` pool so that the HTTP
//! status of a failed call survives intact. A `429` becomes
//! [`GenerationError::RateLimited`], which is what the retry loop keys on.
//!
//! # Example
//!
//! ```rust,no_run
//! use lirith::clients::openai::{Model, OpenAIClient};
//! use lirith::client_wrapper::{ClientWrapper, CompletionOptions, Message};
//!
//! #[tokio::main]
//! async fn main() {
//!     let secret_key = std::env::var("OPEN_AI_SECRET").expect("OPEN_AI_SECRET not set");
//!     let client = OpenAIClient::new_with_model_enum(&secret_key, Model::GPT4o);
//!
//!     let options = CompletionOptions { temperature: 0.75, max_output_tokens: 650 };
//!     let reply = client
//!         .send_message(&[Message::system("You are Lumen."), Message::user("Who are you?")], &options)
//!         .await
//!         .unwrap();
//!     println!("Lumen: {}", reply.content);
//!
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens: {} in / {} out", usage.input_tokens, usage.output_tokens);
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::lirith::client_wrapper::{
    ClientWrapper, CompletionOptions, GenerationError, Message, Role, TokenUsage,
};
use crate::lirith::clients::common::{
    classify_completion_failure, classify_service_failure, get_shared_http_client,
};
use crate::lirith::services::{ClassifierUnavailable, Embedder};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model identifiers commonly used for experiment runs.
pub enum Model {
    /// `gpt-4o` – the reference generation model.
    GPT4o,
    /// `gpt-4o-mini` – cost effective GPT-4o derivative.
    GPT4oMini,
    /// `gpt-4.1` – general availability GPT-4.1.
    GPT41,
    /// `gpt-4.1-mini` – reduced cost GPT-4.1 tier.
    GPT41Mini,
    /// `gpt-4.1-nano` – ultra low cost GPT-4.1 derivative.
    GPT41Nano,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::GPT4o => "gpt-4o".to_string(),
        Model::GPT4oMini => "gpt-4o-mini".to_string(),
        Model::GPT41 => "gpt-4.1".to_string(),
        Model::GPT41Mini => "gpt-4.1-mini".to_string(),
        Model::GPT41Nano => "gpt-4.1-nano".to_string(),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

/// Client wrapper for OpenAI's Chat Completions API.
///
/// Keeps the selected model identifier plus a [`TokenUsage`] slot so callers can inspect what
/// the most recent request consumed.
pub struct OpenAIClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
    model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a new client using the provided API key and [`Model`] variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// Construct a new client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Construct a client targeting an OpenAI compatible base URL (e.g. `http://localhost:8080/v1`).
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        OpenAIClient {
            http: get_shared_http_client().clone(),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|msg| ChatMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Fatal(format!("transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_completion_failure(status, &body);
            if !err.is_rate_limited() && log::log_enabled!(log::Level::Error) {
                log::error!("OpenAIClient::send_message(...): OpenAI API Error: {}", err);
            }
            return Err(err);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Fatal(format!("malformed completion payload: {}", e)))?;

        if let Some(usage) = parsed.usage {
            if let Ok(mut slot) = self.token_usage.lock() {
                *slot = Some(TokenUsage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                });
            }
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Fatal("completion carried no choices".to_string()))?;

        Ok(Message {
            role: Role::Assistant,
            content,
        })
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// [`Embedder`] backed by OpenAI's `/embeddings` endpoint.
pub struct OpenAIEmbeddingClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
    model: String,
}

impl OpenAIEmbeddingClient {
    /// Uses `text-embedding-3-small`.
    pub fn new(secret_key: &str) -> Self {
        Self::new_with_model(secret_key, "text-embedding-3-small")
    }

    pub fn new_with_model(secret_key: &str, model_name: &str) -> Self {
        OpenAIEmbeddingClient {
            http: get_shared_http_client().clone(),
            secret_key: secret_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model_name.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ClassifierUnavailable> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| ClassifierUnavailable::new("embedder", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_service_failure("embedder", status, &body));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ClassifierUnavailable::new("embedder", e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(ClassifierUnavailable::new(
                "embedder",
                format!("expected {} vectors, got {}", texts.len(), parsed.data.len()),
            ));
        }
        parsed.data.sort_by_key(|datum| datum.index);
        Ok(parsed.data.into_iter().map(|datum| datum.embedding).collect())
    }
}
