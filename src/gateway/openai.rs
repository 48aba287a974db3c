//! OpenAI-compatible chat-completions gateway
//!
//! Implements [`TextGenerator`] by calling `POST {base_url}/chat/completions`
//! on any OpenAI-compatible endpoint (OpenAI, Ollama, vLLM, LM Studio, etc.).

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::retry::{retry_generation, JitterBackoff, RetryPolicy};
use super::{ChatMessage, GenerationError, GenerationErrorKind, GenerationResult, TextGenerator};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model to request (e.g., "gpt-4o-mini")
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retry schedule for transient failures
    pub retry: RetryPolicy,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
            retry: RetryPolicy::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Running request and token counters for one gateway instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub requests: u64,
    pub failed_attempts: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

// ─────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible chat-completions client with bounded retries
pub struct OpenAiGateway {
    config: OpenAiConfig,
    client: Client,
    usage: Mutex<UsageTotals>,
}

impl OpenAiGateway {
    /// Create a new gateway with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            max_attempts = config.retry.max_attempts,
            "OpenAI-compatible gateway created"
        );

        Ok(Self {
            config,
            client,
            usage: Mutex::new(UsageTotals::default()),
        })
    }

    /// Snapshot of the request and token counters
    pub fn usage(&self) -> UsageTotals {
        *self.usage.lock()
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.config.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.config.api_key))
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// One HTTP round-trip, classified into a [`GenerationResult`]
    async fn send_once(&self, messages: &[ChatMessage], temperature: f32) -> GenerationResult {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature,
        };

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let response = req.send().await.map_err(classify_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = if status.as_u16() == 429 {
                GenerationErrorKind::RateLimited
            } else if status.is_server_error() {
                GenerationErrorKind::Server
            } else {
                GenerationErrorKind::Client
            };
            return Err(GenerationError::new(kind, format!("API error {}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            GenerationError::new(
                GenerationErrorKind::InvalidResponse,
                format!("Failed to parse API response: {}", e),
            )
        })?;

        if let Some(u) = parsed.usage {
            let mut usage = self.usage.lock();
            usage.prompt_tokens += u.prompt_tokens;
            usage.completion_tokens += u.completion_tokens;
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::new(GenerationErrorKind::EmptyResponse, "No choices in API response")
            })?;

        Ok(content.trim().to_string())
    }
}

fn classify_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::new(GenerationErrorKind::Timeout, format!("Request timed out: {}", e))
    } else if e.is_connect() || e.is_request() {
        GenerationError::new(GenerationErrorKind::Connection, format!("Connection error: {}", e))
    } else {
        GenerationError::new(GenerationErrorKind::Client, format!("Request error: {}", e))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGateway {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, messages: &[ChatMessage], temperature: f32) -> GenerationResult {
        let schedule = JitterBackoff::new(self.config.retry.clone());

        let result = retry_generation(schedule, |attempt| async move {
            debug!(attempt, messages = messages.len(), temperature, "Sending chat completion");
            let outcome = self.send_once(messages, temperature).await;
            if outcome.is_err() {
                self.usage.lock().failed_attempts += 1;
            }
            outcome
        })
        .await;

        self.usage.lock().requests += 1;
        result
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_empty());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_auth_header() {
        let config = OpenAiConfig {
            api_key: "sk-test-123".to_string(),
            ..Default::default()
        };
        let gateway = OpenAiGateway::new(config).unwrap();
        assert_eq!(gateway.auth_header(), Some("Bearer sk-test-123".to_string()));

        let no_key = OpenAiGateway::new(OpenAiConfig::default()).unwrap();
        assert_eq!(no_key.auth_header(), None);
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let config = OpenAiConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..Default::default()
        };
        let gateway = OpenAiGateway::new(config).unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["temperature"], 0.5);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_connection_failure() {
        let config = OpenAiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            retry: RetryPolicy::immediate(2),
            ..Default::default()
        };
        let gateway = OpenAiGateway::new(config).unwrap();
        let err = gateway
            .generate(&[ChatMessage::user("Say 'pong'")], 0.0)
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind,
            GenerationErrorKind::Connection | GenerationErrorKind::Timeout
        ));
        let usage = gateway.usage();
        assert_eq!(usage.requests, 1);
        assert_eq!(usage.failed_attempts, 2);
    }
}
