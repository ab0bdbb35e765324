//! OpenAI-compatible Chat Completions provider.
//!
//! Talks to any `/v1/chat/completions` endpoint with bearer-key auth.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::OracleConfig;
use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

const PROVIDER: &str = "openai_chat";

/// Chat Completions API provider.
pub struct OpenAiChatProvider {
    client: Client,
    config: OracleConfig,
}

impl OpenAiChatProvider {
    /// Create a provider. Fails if no API key is configured.
    pub fn new(config: OracleConfig) -> Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.base_url,
            path.trim_start_matches('/')
        )
    }

    async fn post_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let url = self.api_url("chat/completions");
        let key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            })?;

        tracing::debug!(model = %request.model, %url, "Asking oracle for completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Oracle unreachable");
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: PROVIDER.to_string(),
                        timeout: self.config.timeout,
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: format!("transport error: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!(%status, "Oracle rejected completion request");
            return Err(status_error(status, retry_after, &body));
        }

        serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("completion body is not a chat response: {}", e),
        })
    }
}

/// Longest slice of an error body carried into `RequestFailed`.
const MAX_ERROR_BODY: usize = 200;

/// Map a non-success status to the matching provider error.
fn status_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after,
        },
        _ => {
            let body = body.trim();
            let excerpt = match body.char_indices().nth(MAX_ERROR_BODY) {
                Some((cut, _)) => &body[..cut],
                None => body,
            };
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("oracle answered {}: {}", status, excerpt),
            }
        }
    }
}

/// `Retry-After` in delay-seconds form. HTTP dates are ignored.
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[async_trait]
impl LlmProvider for OpenAiChatProvider {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: req.messages.into_iter().map(Into::into).collect(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let response = self.post_completion(&request).await?;

        let choice =
            response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: "No choices in response".to_string(),
                })?;

        let content = choice
            .message
            .and_then(|msg| msg.content)
            .unwrap_or_default();

        let (input_tokens, output_tokens) = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(CompletionResponse {
            content,
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            input_tokens,
            output_tokens,
        })
    }
}

fn parse_finish_reason(raw: Option<&str>) -> FinishReason {
    let fr = raw.unwrap_or("");
    if fr.contains("stop") {
        FinishReason::Stop
    } else if fr.contains("length") {
        FinishReason::Length
    } else if fr.contains("content_filter") {
        FinishReason::ContentFilter
    } else {
        FinishReason::Unknown
    }
}

// OpenAI-compatible Chat Completions API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionMessage {
    role: String,
    content: Option<String>,
}

impl From<ChatMessage> for ChatCompletionMessage {
    fn from(msg: ChatMessage) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: Some(msg.content),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatCompletionMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = OpenAiChatProvider::new(OracleConfig::default());
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
    }

    #[test]
    fn test_api_url_joins_path() {
        let config = OracleConfig {
            base_url: "http://localhost:9000".to_string(),
            api_key: Some(SecretString::from("sk-test")),
            ..OracleConfig::default()
        };
        let provider = OpenAiChatProvider::new(config).unwrap();
        assert_eq!(
            provider.api_url("/chat/completions"),
            "http://localhost:9000/v1/chat/completions"
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, ""),
            LlmError::AuthFailed { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(7)), ""),
            LlmError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(7)
        ));

        let long_body = "x".repeat(1000);
        match status_error(StatusCode::BAD_GATEWAY, None, &long_body) {
            LlmError::RequestFailed { reason, .. } => {
                assert!(reason.starts_with("oracle answered 502 Bad Gateway: "));
                assert!(reason.len() < 300);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"), None);
    }

    #[test]
    fn test_message_conversion() {
        let msg = ChatMessage::system("Be brief");
        let chat_msg: ChatCompletionMessage = msg.into();
        assert_eq!(chat_msg.role, "system");
        assert_eq!(chat_msg.content, Some("Be brief".to_string()));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(
            parsed.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(
            parse_finish_reason(parsed.choices[0].finish_reason.as_deref()),
            FinishReason::Stop
        );
    }

    #[test]
    fn test_finish_reason_unknown() {
        assert_eq!(parse_finish_reason(None), FinishReason::Unknown);
        assert_eq!(parse_finish_reason(Some("length")), FinishReason::Length);
    }
}
