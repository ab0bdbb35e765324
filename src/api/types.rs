//! Request and response DTOs for the estimation API.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::conversation::{ConversationStep, ConversationTurn};
use crate::error::{EstimationError, LlmError};
use crate::estimation::phases::PhaseShare;
use crate::estimation::{EstimateReport, HistoricalProject, ProjectFeatureRecord};
use crate::service::ConversationEstimate;

/// Step assumed when a direct estimate request does not name one.
pub const DEFAULT_STEP: ConversationStep = ConversationStep::new(ConversationStep::MAX);

// --- Estimate ---

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    /// Kept loose so a missing or non-object value becomes a 400 with a
    /// useful message.
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub step: Option<i64>,
}

impl EstimateRequest {
    pub fn record(&self) -> Result<ProjectFeatureRecord, EstimationError> {
        let analysis = self
            .analysis
            .as_ref()
            .ok_or(EstimationError::MissingField("analysis"))?;
        ProjectFeatureRecord::from_request_value(analysis)
    }

    pub fn step(&self) -> Result<ConversationStep, EstimationError> {
        match self.step {
            None => Ok(DEFAULT_STEP),
            Some(raw) => u8::try_from(raw)
                .map(ConversationStep::new)
                .map_err(|_| EstimationError::InvalidStep(raw)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: EstimateReport,
}

// --- Classify ---

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub messages: Vec<ConversationTurn>,
}

// --- Analyze ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub conversation_text: String,
    #[serde(default)]
    pub current_estimate: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: ProjectFeatureRecord,
    /// True when the oracle's reply did not validate and defaults were used.
    pub fallback: bool,
}

// --- Conversation ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEstimateRequest {
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub current_estimate: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ConversationEstimateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: ConversationEstimate,
}

// --- Catalog ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse<'a> {
    pub count: usize,
    pub currency: &'a str,
    pub projects: &'a [HistoricalProject],
    pub phase_distribution: &'a [PhaseShare],
}

// --- Errors ---

/// Error returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Upstream(#[from] LlmError),

    #[error("{0}")]
    Internal(String),
}

impl From<EstimationError> for ApiError {
    fn from(e: EstimationError) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::InvalidInput(message) => message.clone(),
            ApiError::Upstream(e) => {
                tracing::error!("Oracle request failed: {}", e);
                "Project analysis is temporarily unavailable".to_string()
            }
            ApiError::Internal(reason) => {
                tracing::error!("Internal error: {}", reason);
                "Internal server error".to_string()
            }
        };

        (
            self.status(),
            Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}
