//! [`GrammarChecker`] backed by a LanguageTool server (`/v2/check`).

use async_trait::async_trait;
use serde::Deserialize;

use crate::lirith::clients::common::{classify_service_failure, get_shared_http_client};
use crate::lirith::services::{ClassifierUnavailable, GrammarChecker};

const PUBLIC_BASE_URL: &str = "https://api.languagetool.org";

#[derive(Deserialize)]
struct CheckResponse {
    matches: Vec<serde_json::Value>,
}

/// Counts the rule matches LanguageTool reports for a text.
pub struct LanguageToolClient {
    http: reqwest::Client,
    base_url: String,
    language: String,
}

impl LanguageToolClient {
    /// A client for a self-hosted server, e.g. `http://localhost:8081`.
    pub fn new(base_url: &str) -> Self {
        LanguageToolClient {
            http: get_shared_http_client().clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            language: "en-US".to_string(),
        }
    }

    /// The public endpoint. Subject to its request quotas.
    pub fn public() -> Self {
        Self::new(PUBLIC_BASE_URL)
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

#[async_trait]
impl GrammarChecker for LanguageToolClient {
    async fn error_count(&self, text: &str) -> Result<usize, ClassifierUnavailable> {
        let response = self
            .http
            .post(format!("{}/v2/check", self.base_url))
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await
            .map_err(|e| ClassifierUnavailable::new("grammar", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_service_failure("grammar", status, &body));
        }

        let parsed: CheckResponse = response
            .json()
            .await
            .map_err(|e| ClassifierUnavailable::new("grammar", e.to_string()))?;
        Ok(parsed.matches.len())
    }
}
