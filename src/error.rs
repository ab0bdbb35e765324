//! Error types for quotecraft.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the hosted language model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} did not answer within {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Failure to turn an oracle reply into a feature record.
///
/// Never shown to end users: the extractor logs it and substitutes the
/// default record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No JSON object found in response")]
    NoJsonObject,

    #[error("Malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Historical catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported catalog version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Phase distribution sums to {total}%, expected 100%")]
    PhaseShareSum { total: String },

    #[error("Phase distribution is missing phase {0}")]
    MissingPhase(String),
}

/// Structurally invalid estimation input.
#[derive(Debug, thiserror::Error)]
pub enum EstimationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} must be a JSON object, found {found}")]
    NotAnObject {
        field: &'static str,
        found: &'static str,
    },

    #[error("Invalid conversation step {0}")]
    InvalidStep(i64),
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed { addr: String, reason: String },

    #[error("Server terminated: {0}")]
    Serve(String),
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
