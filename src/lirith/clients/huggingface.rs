//! Hugging Face Inference API client for text-classification models.
//!
//! One [`HuggingFaceClassifier`] serves one model. The reference experiment uses two:
//! an emotion model whose full label distribution feeds the affect metrics, and an MNLI
//! model whose top label becomes `nli_relation`.

use async_trait::async_trait;
use serde_json::Value;

use crate::lirith::clients::common::{classify_service_failure, get_shared_http_client};
use crate::lirith::services::{
    ClassifierUnavailable, EmotionClassifier, EntailmentClassifier, LabelScore,
};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Emotion model of the reference setup.
pub const EMOTION_MODEL: &str = "j-hartmann/emotion-english-distilroberta-base";
/// Entailment model of the reference setup.
pub const ENTAILMENT_MODEL: &str = "facebook/bart-large-mnli";

/// Text-classification client for a single hosted model.
pub struct HuggingFaceClassifier {
    http: reqwest::Client,
    api_token: String,
    base_url: String,
    model: String,
    service: &'static str,
}

impl HuggingFaceClassifier {
    pub fn new(api_token: &str, model: &str) -> Self {
        HuggingFaceClassifier {
            http: get_shared_http_client().clone(),
            api_token: api_token.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            service: "classifier",
        }
    }

    /// Classifier for [`EMOTION_MODEL`].
    pub fn emotion(api_token: &str) -> Self {
        let mut classifier = Self::new(api_token, EMOTION_MODEL);
        classifier.service = "emotion";
        classifier
    }

    /// Classifier for [`ENTAILMENT_MODEL`].
    pub fn entailment(api_token: &str) -> Self {
        let mut classifier = Self::new(api_token, ENTAILMENT_MODEL);
        classifier.service = "entailment";
        classifier
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    async fn scores(&self, input: &str) -> Result<Vec<LabelScore>, ClassifierUnavailable> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, self.model))
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({
                "inputs": input,
                "parameters": { "top_k": null },
                "options": { "wait_for_model": true },
            }))
            .send()
            .await
            .map_err(|e| ClassifierUnavailable::new(self.service, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_service_failure(self.service, status, &body));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClassifierUnavailable::new(self.service, e.to_string()))?;

        parse_label_scores(&payload).ok_or_else(|| {
            ClassifierUnavailable::new(self.service, format!("unexpected payload: {}", payload))
        })
    }
}

/// Accepts both `[{label, score}, ..]` and the batched `[[{label, score}, ..]]` shapes.
pub fn parse_label_scores(payload: &Value) -> Option<Vec<LabelScore>> {
    let items = payload.as_array()?;
    let items = match items.first() {
        Some(Value::Array(inner)) => inner,
        _ => items,
    };
    items
        .iter()
        .map(|item| serde_json::from_value::<LabelScore>(item.clone()).ok())
        .collect()
}

/// The highest-scoring label, upper-cased so `"entailment"` and `"ENTAILMENT"` compare equal.
pub fn top_label(scores: &[LabelScore]) -> Option<String> {
    scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|best| best.label.to_uppercase())
}

#[async_trait]
impl EmotionClassifier for HuggingFaceClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierUnavailable> {
        self.scores(text).await
    }
}

#[async_trait]
impl EntailmentClassifier for HuggingFaceClassifier {
    async fn relation(
        &self,
        premise: &str,
        hypothesis: &str,
    ) -> Result<String, ClassifierUnavailable> {
        let scores = self
            .scores(&format!("{} </s> {}", premise, hypothesis))
            .await?;
        top_label(&scores)
            .ok_or_else(|| ClassifierUnavailable::new(self.service, "empty label distribution"))
    }
}
