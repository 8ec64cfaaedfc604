//! Black-box scoring services used by the metrics engine.
//!
//! Every remote model the metrics depend on sits behind one of the traits below so the
//! engine can be exercised with deterministic fakes and so vendors can be swapped without
//! touching metric definitions. All of them report failure as [`ClassifierUnavailable`];
//! the engine never propagates it, it degrades the affected metric instead.
//!
//! | Trait | Reference implementation |
//! |---|---|
//! | [`Embedder`] | [`OpenAIEmbeddingClient`](crate::clients::openai::OpenAIEmbeddingClient) |
//! | [`EmotionClassifier`] | [`HuggingFaceClassifier::emotion`](crate::clients::huggingface::HuggingFaceClassifier::emotion) |
//! | [`EntailmentClassifier`] | [`HuggingFaceClassifier::entailment`](crate::clients::huggingface::HuggingFaceClassifier::entailment) |
//! | [`GrammarChecker`] | [`LanguageToolClient`](crate::clients::languagetool::LanguageToolClient) |
//! | [`ReadabilityScorer`] | [`FleschKincaid`](crate::readability::FleschKincaid) (local) |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::lirith::readability::FleschKincaid;

/// A scoring service could not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierUnavailable {
    /// Short service name, e.g. `"embedder"` or `"emotion"`.
    pub service: String,
    pub reason: String,
}

impl ClassifierUnavailable {
    pub fn new(service: impl Into<String>, reason: impl Into<String>) -> Self {
        ClassifierUnavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ClassifierUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable: {}", self.service, self.reason)
    }
}

impl Error for ClassifierUnavailable {}

/// One label of a classifier's output distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Maps texts to dense vectors. One vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ClassifierUnavailable>;
}

/// Returns the full label distribution of an emotion model for one text.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierUnavailable>;
}

/// Returns the top natural-language-inference label for a premise/hypothesis pair.
#[async_trait]
pub trait EntailmentClassifier: Send + Sync {
    async fn relation(
        &self,
        premise: &str,
        hypothesis: &str,
    ) -> Result<String, ClassifierUnavailable>;
}

/// Counts grammar issues in a text.
#[async_trait]
pub trait GrammarChecker: Send + Sync {
    async fn error_count(&self, text: &str) -> Result<usize, ClassifierUnavailable>;
}

/// Grade-level readability. Computed locally, so not async.
pub trait ReadabilityScorer: Send + Sync {
    fn grade_level(&self, text: &str) -> Result<f64, ClassifierUnavailable>;
}

/// The bundle of services a [`MetricsEngine`](crate::metrics::MetricsEngine) scores with.
#[derive(Clone)]
pub struct ServiceSuite {
    pub embedder: Arc<dyn Embedder>,
    pub emotion: Arc<dyn EmotionClassifier>,
    pub entailment: Arc<dyn EntailmentClassifier>,
    pub grammar: Arc<dyn GrammarChecker>,
    pub readability: Arc<dyn ReadabilityScorer>,
}

impl ServiceSuite {
    /// Bundle the remote services; readability defaults to the local [`FleschKincaid`] scorer.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        emotion: Arc<dyn EmotionClassifier>,
        entailment: Arc<dyn EntailmentClassifier>,
        grammar: Arc<dyn GrammarChecker>,
    ) -> Self {
        ServiceSuite {
            embedder,
            emotion,
            entailment,
            grammar,
            readability: Arc::new(FleschKincaid),
        }
    }

    pub fn with_readability(mut self, readability: Arc<dyn ReadabilityScorer>) -> Self {
        self.readability = readability;
        self
    }
}
