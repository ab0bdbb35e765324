//! Feature extraction through the hosted model.
//!
//! The model reads the conversation and answers with a feature record,
//! usually wrapped in some prose. Anything that does not validate is
//! replaced with the default record; callers never see parse failures.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::LlmError;
use crate::estimation::features::{ProjectFeatureRecord, parse_feature_record};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

const SYSTEM_PROMPT: &str = r#"You analyse conversations between a design agency and a prospective client.
Extract the project requirements the client has described so far.

Respond with a single JSON object and nothing else, in exactly this shape:
{
    "platforms": ["web" | "mobile-ios" | "mobile-android" | "desktop"],
    "features": ["short kebab-case tags, e.g. ecommerce, ai, user-auth, payments, dashboard, reports"],
    "complexity": "simple" | "medium" | "complex" | "enterprise",
    "businessType": "what the client's business does",
    "integrations": ["third-party services mentioned"],
    "estimatedHours": { "optional": "your own rough guess per phase" }
}

Use empty arrays and an empty string for anything not mentioned yet.
If complexity is unclear, use "medium"."#;

const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.2;

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractionSource {
    /// The model's reply validated.
    Oracle,
    /// The default record was substituted.
    Fallback { reason: String },
}

/// A feature record and its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub record: ProjectFeatureRecord,
    pub source: ExtractionSource,
}

impl Extraction {
    fn fallback(reason: impl Into<String>) -> Self {
        Self {
            record: ProjectFeatureRecord::default(),
            source: ExtractionSource::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ExtractionSource::Fallback { .. })
    }
}

/// Asks the model for a feature record.
pub struct FeatureExtractor {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl FeatureExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Ask the model about `conversation_text`.
    ///
    /// Transport failures and timeouts are returned as errors. A reply that
    /// does not validate falls back to the default record.
    pub async fn request(
        &self,
        conversation_text: &str,
        current_estimate: Option<&Value>,
    ) -> Result<Extraction, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(conversation_text, current_estimate)),
        ])
        .with_max_tokens(MAX_TOKENS)
        .with_temperature(TEMPERATURE);

        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.llm.model_name().to_string(),
                timeout: self.timeout,
            })??;

        match parse_feature_record(&response.content) {
            Ok(record) => {
                tracing::debug!(
                    platforms = record.platforms.len(),
                    features = record.features.len(),
                    complexity = ?record.complexity,
                    "Extracted feature record"
                );
                Ok(Extraction {
                    record,
                    source: ExtractionSource::Oracle,
                })
            }
            Err(e) => {
                tracing::warn!(
                    model = self.llm.model_name(),
                    "Oracle reply did not validate, using default record: {}",
                    e
                );
                Ok(Extraction::fallback(e.to_string()))
            }
        }
    }

    /// Like [`request`](Self::request), but any failure yields the default
    /// record so the pipeline can carry on.
    pub async fn extract_or_default(
        &self,
        conversation_text: &str,
        current_estimate: Option<&Value>,
    ) -> Extraction {
        match self.request(conversation_text, current_estimate).await {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!("Oracle unavailable, using default record: {}", e);
                Extraction::fallback(e.to_string())
            }
        }
    }
}

fn build_user_prompt(conversation_text: &str, current_estimate: Option<&Value>) -> String {
    let mut prompt = format!("Conversation so far:\n\n{}", conversation_text.trim());
    if let Some(estimate) = current_estimate.filter(|v| !v.is_null()) {
        prompt.push_str(&format!(
            "\n\nEstimate currently shown to the client:\n{}",
            estimate
        ));
    }
    prompt
}
