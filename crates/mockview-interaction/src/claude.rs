//! ClaudeGenerator - question generation over the Claude REST API.
//!
//! Calls the messages API directly with reqwest. Configuration priority for
//! the API key: ANTHROPIC_API_KEY environment variable, then the
//! `[generation] api_key` config field.

use async_trait::async_trait;
use mockview_core::config::GenerationConfig;
use mockview_core::error::{MockviewError, Result};
use mockview_core::generation::{
    GeneratedOpening, GeneratedSummary, GeneratedTurn, GenerationError, InterviewContext,
    QuestionGenerator,
};
use mockview_core::session::Turn;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::prompts;

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Generator implementation that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeGenerator {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeGenerator {
    /// Creates a new generator with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
        }
    }

    /// Builds a generator from configuration.
    ///
    /// The ANTHROPIC_API_KEY environment variable takes priority over the
    /// config file's `api_key` field.
    pub fn try_from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .or_else(|| config.api_key.clone())
            .ok_or_else(|| {
                MockviewError::config(
                    "No API key: set ANTHROPIC_API_KEY or [generation] api_key in config.toml",
                )
            })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MockviewError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn send_prompt(&self, prompt: String) -> std::result::Result<String, GenerationError> {
        tracing::debug!(
            target: "claude",
            "Sending prompt to {} ({} chars)",
            self.model,
            prompt.len()
        );
        let request = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() {
                    GenerationError::transient(format!("Claude API request failed: {err}"))
                } else {
                    GenerationError::permanent(format!("Claude API request failed: {err}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            tracing::warn!(
                target: "claude",
                "Claude API returned status {} (retry-after: {:?})",
                status,
                retry_after
            );
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: CreateMessageResponse = response.json().await.map_err(|err| {
            GenerationError::permanent(format!("Failed to parse Claude response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl QuestionGenerator for ClaudeGenerator {
    async fn generate_opening(
        &self,
        context: &InterviewContext,
    ) -> std::result::Result<GeneratedOpening, GenerationError> {
        let prompt = prompts::render_opening(context)?;
        let question = self.send_prompt(prompt).await?;
        Ok(GeneratedOpening {
            question: question.trim().to_string(),
        })
    }

    async fn generate_next(
        &self,
        context: &InterviewContext,
        history: &[Turn],
        answer: &str,
    ) -> std::result::Result<GeneratedTurn, GenerationError> {
        let prompt = prompts::render_next(context, history, answer)?;
        let text = self.send_prompt(prompt).await?;
        Ok(parse_turn_response(&text))
    }

    async fn generate_summary(
        &self,
        context: &InterviewContext,
        history: &[Turn],
    ) -> std::result::Result<GeneratedSummary, GenerationError> {
        let prompt = prompts::render_summary(context, history)?;
        let summary = self.send_prompt(prompt).await?;
        Ok(GeneratedSummary {
            summary: summary.trim().to_string(),
        })
    }
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    r#type: String,
    message: String,
}

#[derive(Deserialize)]
struct TurnResponseJson {
    question: String,
    #[serde(default)]
    feedback: Option<String>,
}

fn extract_text_response(
    response: CreateMessageResponse,
) -> std::result::Result<String, GenerationError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
        })
        .ok_or_else(|| {
            GenerationError::permanent("Claude API returned no text in the response content")
        })
}

/// Parses the model's next-turn response.
///
/// The prompt asks for a JSON object, but models occasionally wrap it in a
/// code fence or answer in plain prose; both are accepted, with the prose
/// treated as the question and no feedback.
fn parse_turn_response(text: &str) -> GeneratedTurn {
    let trimmed = text.trim();
    let candidate = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    match serde_json::from_str::<TurnResponseJson>(candidate) {
        Ok(parsed) => GeneratedTurn {
            question: parsed.question,
            feedback: parsed
                .feedback
                .filter(|feedback| !feedback.trim().is_empty()),
        },
        Err(_) => GeneratedTurn {
            question: trimmed.to_string(),
            feedback: None,
        },
    }
}

fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> GenerationError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.clone());
    let message = format!("Claude API error {}: {}", status.as_u16(), message);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    if !is_retryable {
        return GenerationError::permanent(message);
    }
    match retry_after {
        Some(delay) => GenerationError::transient_with_retry_after(message, delay),
        None => GenerationError::transient(message),
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Retry-After HTTP-date parsing is omitted for simplicity
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_http_error_classification() {
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, "{}".into(), None);
        assert!(err.is_transient());

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "{}".into(), None);
        assert!(err.is_transient());

        let err = map_http_error(StatusCode::BAD_REQUEST, "{}".into(), None);
        assert!(!err.is_transient());

        let err = map_http_error(StatusCode::UNAUTHORIZED, "{}".into(), None);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_map_http_error_carries_retry_after() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"rate_limit_error","message":"slow down"}}"#.into(),
            Some(Duration::from_secs(7)),
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(err.to_string().contains("slow down"));
    }

    #[test]
    fn test_parse_retry_after_header() {
        let value = HeaderValue::from_static("12");
        assert_eq!(
            parse_retry_after(Some(&value)),
            Some(Duration::from_secs(12))
        );
        let value = HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&value)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_parse_turn_response_json() {
        let turn = parse_turn_response(
            r#"{"question": "How did you shard it?", "feedback": "Good detail."}"#,
        );
        assert_eq!(turn.question, "How did you shard it?");
        assert_eq!(turn.feedback.as_deref(), Some("Good detail."));
    }

    #[test]
    fn test_parse_turn_response_fenced_json() {
        let turn =
            parse_turn_response("```json\n{\"question\": \"Why Rust?\"}\n```");
        assert_eq!(turn.question, "Why Rust?");
        assert!(turn.feedback.is_none());
    }

    #[test]
    fn test_parse_turn_response_prose_fallback() {
        let turn = parse_turn_response("What was the hardest bug you fixed?");
        assert_eq!(turn.question, "What was the hardest bug you fixed?");
        assert!(turn.feedback.is_none());
    }

    #[test]
    fn test_parse_turn_response_blank_feedback_dropped() {
        let turn = parse_turn_response(r#"{"question": "Next?", "feedback": "  "}"#);
        assert!(turn.feedback.is_none());
    }
}
