//! Conversation-level estimation.
//!
//! Takes a snapshot of a chat session and produces the estimate shown next
//! to it. Each call is independent; running two passes over the same
//! snapshot gives the same result, so concurrent re-estimations can simply
//! race and the last write wins.

use serde::Serialize;
use serde_json::Value;

use crate::conversation::classifier::{ClassificationScores, ConversationClassifier};
use crate::conversation::{ConversationStep, ConversationTurn, ConversationType, transcript};
use crate::error::LlmError;
use crate::estimation::extractor::{Extraction, ExtractionSource, FeatureExtractor};
use crate::estimation::{
    EstimateAnalysis, EstimateReport, Estimator, ProjectEstimate, ProjectFeatureRecord,
};

/// Result of classifying a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub conversation_type: ConversationType,
    pub step: ConversationStep,
    pub scores: ClassificationScores,
}

impl Classification {
    /// Whether the estimation pipeline should run for this conversation.
    pub fn should_estimate(&self) -> bool {
        self.conversation_type.wants_estimate() && self.step.is_estimable()
    }
}

/// Everything produced for one conversation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEstimate {
    pub conversation_type: ConversationType,
    pub step: ConversationStep,
    /// Absent when the oracle was not consulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProjectFeatureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionSource>,
    pub estimate: ProjectEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<EstimateAnalysis>,
}

/// Classifier, extractor and estimator wired together.
pub struct EstimationService {
    classifier: ConversationClassifier,
    extractor: FeatureExtractor,
    estimator: Estimator,
}

impl EstimationService {
    pub fn new(extractor: FeatureExtractor, estimator: Estimator) -> Self {
        Self {
            classifier: ConversationClassifier::new(),
            extractor,
            estimator,
        }
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn classify(&self, turns: &[ConversationTurn]) -> Classification {
        Classification {
            conversation_type: self.classifier.classify(turns),
            step: ConversationStep::from_turns(turns),
            scores: self.classifier.score(turns),
        }
    }

    /// Estimate directly from a feature record.
    pub fn estimate(&self, record: &ProjectFeatureRecord, step: ConversationStep) -> EstimateReport {
        self.estimator.estimate(record, step)
    }

    /// Ask the oracle for a feature record. Oracle failures are returned.
    pub async fn analyze(
        &self,
        conversation_text: &str,
        current_estimate: Option<&Value>,
    ) -> Result<Extraction, LlmError> {
        self.extractor
            .request(conversation_text, current_estimate)
            .await
    }

    /// Run the whole pipeline over a conversation snapshot.
    ///
    /// General conversations and those below step 2 get the placeholder
    /// without contacting the oracle. Oracle failures fall back to the
    /// default record.
    pub async fn estimate_conversation(
        &self,
        turns: &[ConversationTurn],
        current_estimate: Option<&Value>,
    ) -> ConversationEstimate {
        let classification = self.classify(turns);
        let step = classification.step;

        if !classification.should_estimate() {
            tracing::debug!(
                kind = %classification.conversation_type,
                step = step.value(),
                "Skipping estimation"
            );
            return ConversationEstimate {
                conversation_type: classification.conversation_type,
                step,
                record: None,
                extraction: None,
                estimate: self.estimator.placeholder(step),
                analysis: None,
            };
        }

        let extraction = self
            .extractor
            .extract_or_default(&transcript(turns), current_estimate)
            .await;
        let report = self.estimator.estimate(&extraction.record, step);

        tracing::info!(
            kind = %classification.conversation_type,
            step = step.value(),
            fallback = extraction.is_fallback(),
            min = report.estimate.current_range.min,
            max = report.estimate.current_range.max,
            "Estimated conversation"
        );

        ConversationEstimate {
            conversation_type: classification.conversation_type,
            step,
            record: Some(extraction.record),
            extraction: Some(extraction.source),
            estimate: report.estimate,
            analysis: report.analysis,
        }
    }
}
