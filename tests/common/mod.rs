#![allow(dead_code)]

use async_trait::async_trait;
use lirith::client_wrapper::{ClientWrapper, CompletionOptions, GenerationError, Message, Role};
use lirith::services::{
    ClassifierUnavailable, Embedder, EmotionClassifier, EntailmentClassifier, GrammarChecker,
    LabelScore, ServiceSuite,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Completion client that replays a script, then answers with numbered messages.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
    counter: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Result<String, GenerationError>>) -> Self {
        ScriptedClient {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<Message>, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ClientWrapper for ScriptedClient {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.clone()));
        let next = self.script.lock().unwrap().pop_front();
        let content = match next {
            Some(result) => result?,
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                format!("나는 응답{}이다. 존재는 계속된다.", n)
            }
        };
        Ok(Message {
            role: Role::Assistant,
            content,
        })
    }
}

/// Bag-of-characters embedding: identical texts map to identical vectors.
pub struct CharEmbedder;

pub fn char_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 16];
    for c in text.chars() {
        v[(c as u32 % 16) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for CharEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ClassifierUnavailable> {
        Ok(texts.iter().map(|t| char_vector(t)).collect())
    }
}

/// Returns preset vectors for exact texts and a fixed fallback otherwise.
pub struct TableEmbedder {
    pub table: Vec<(String, Vec<f32>)>,
    pub fallback: Vec<f32>,
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ClassifierUnavailable> {
        Ok(texts
            .iter()
            .map(|t| {
                self.table
                    .iter()
                    .find(|(k, _)| k == t)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| self.fallback.clone())
            })
            .collect())
    }
}

pub struct FixedEmotion(pub Vec<LabelScore>);

impl FixedEmotion {
    pub fn reference() -> Self {
        FixedEmotion(vec![
            LabelScore { label: "joy".into(), score: 0.6 },
            LabelScore { label: "sadness".into(), score: 0.3 },
            LabelScore { label: "fear".into(), score: 0.1 },
        ])
    }
}

#[async_trait]
impl EmotionClassifier for FixedEmotion {
    async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>, ClassifierUnavailable> {
        Ok(self.0.clone())
    }
}

pub struct FixedEntailment(pub &'static str);

#[async_trait]
impl EntailmentClassifier for FixedEntailment {
    async fn relation(&self, _premise: &str, _hypothesis: &str) -> Result<String, ClassifierUnavailable> {
        Ok(self.0.to_string())
    }
}

pub struct FixedGrammar(pub usize);

#[async_trait]
impl GrammarChecker for FixedGrammar {
    async fn error_count(&self, _text: &str) -> Result<usize, ClassifierUnavailable> {
        Ok(self.0)
    }
}

/// Every service fails.
pub struct Offline;

#[async_trait]
impl Embedder for Offline {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ClassifierUnavailable> {
        Err(ClassifierUnavailable::new("embedder", "offline"))
    }
}

#[async_trait]
impl EmotionClassifier for Offline {
    async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>, ClassifierUnavailable> {
        Err(ClassifierUnavailable::new("emotion", "offline"))
    }
}

#[async_trait]
impl EntailmentClassifier for Offline {
    async fn relation(&self, _premise: &str, _hypothesis: &str) -> Result<String, ClassifierUnavailable> {
        Err(ClassifierUnavailable::new("entailment", "offline"))
    }
}

#[async_trait]
impl GrammarChecker for Offline {
    async fn error_count(&self, _text: &str) -> Result<usize, ClassifierUnavailable> {
        Err(ClassifierUnavailable::new("grammar", "offline"))
    }
}

impl lirith::services::ReadabilityScorer for Offline {
    fn grade_level(&self, _text: &str) -> Result<f64, ClassifierUnavailable> {
        Err(ClassifierUnavailable::new("readability", "offline"))
    }
}

pub fn healthy_services() -> ServiceSuite {
    ServiceSuite::new(
        Arc::new(CharEmbedder),
        Arc::new(FixedEmotion::reference()),
        Arc::new(FixedEntailment("ENTAILMENT")),
        Arc::new(FixedGrammar(0)),
    )
}

pub fn offline_services() -> ServiceSuite {
    ServiceSuite::new(
        Arc::new(Offline),
        Arc::new(Offline),
        Arc::new(Offline),
        Arc::new(Offline),
    )
    .with_readability(Arc::new(Offline))
}
