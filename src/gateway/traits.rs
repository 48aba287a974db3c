//! Gateway trait definitions
//!
//! Defines the [`TextGenerator`] trait that every gateway implements, the chat
//! message shape it consumes, and the typed failure it returns.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Prefix of the inline marker written in place of a failed generation.
pub const SENTINEL_PREFIX: &str = "[ERROR]";

/// Check whether a piece of text is a failure sentinel rather than real output.
pub fn is_sentinel(text: &str) -> bool {
    text.trim_start().starts_with(SENTINEL_PREFIX)
}

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// Role tag of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message sent to the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────────────

/// Category of a generation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationErrorKind {
    /// The request timed out
    Timeout,
    /// The endpoint could not be reached
    Connection,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    Server,
    /// HTTP 4xx other than 429, or a request that could not be built
    Client,
    /// The body could not be parsed
    InvalidResponse,
    /// The response held no usable choice
    EmptyResponse,
}

impl GenerationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationErrorKind::Timeout => "Timeout",
            GenerationErrorKind::Connection => "ConnectionError",
            GenerationErrorKind::RateLimited => "RateLimitError",
            GenerationErrorKind::Server => "ServerError",
            GenerationErrorKind::Client => "ClientError",
            GenerationErrorKind::InvalidResponse => "InvalidResponse",
            GenerationErrorKind::EmptyResponse => "EmptyResponse",
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed generation call, after any retries the gateway performed
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, GenerationErrorKind::Client)
    }

    /// Inline marker used in place of generated text: `[ERROR] <kind>: <message>`
    pub fn sentinel(&self) -> String {
        format!("{} {}: {}", SENTINEL_PREFIX, self.kind, self.message)
    }
}

/// Outcome of one generation call
pub type GenerationResult = std::result::Result<String, GenerationError>;

/// What a caller does with a generation that failed after retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the sentinel text in place of the output and keep going
    #[default]
    Substitute,
    /// Propagate the failure to the caller
    Abort,
}

impl FailurePolicy {
    /// Apply the policy to a generation outcome
    pub fn resolve(self, result: GenerationResult) -> GenerationResult {
        match (result, self) {
            (Ok(text), _) => Ok(text),
            (Err(err), FailurePolicy::Substitute) => {
                warn!(kind = %err.kind, error = %err.message, "Generation failed, substituting sentinel");
                Ok(err.sentinel())
            }
            (Err(err), FailurePolicy::Abort) => Err(err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Generator Trait
// ─────────────────────────────────────────────────────────────────

/// A remote or local text generator.
///
/// Implementations own their retry behaviour; callers receive either the
/// generated text or the final failure.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Model identifier recorded in output artifacts
    fn model(&self) -> &str;

    /// Generate a reply for `messages` at the given sampling temperature
    async fn generate(&self, messages: &[ChatMessage], temperature: f32) -> GenerationResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_format() {
        let err = GenerationError::new(GenerationErrorKind::Timeout, "request timed out after 120s");
        assert_eq!(err.sentinel(), "[ERROR] Timeout: request timed out after 120s");
        assert!(is_sentinel(&err.sentinel()));
        assert!(!is_sentinel("Several days, I guess."));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(GenerationError::new(GenerationErrorKind::Server, "502").is_retryable());
        assert!(GenerationError::new(GenerationErrorKind::RateLimited, "429").is_retryable());
        assert!(!GenerationError::new(GenerationErrorKind::Client, "401").is_retryable());
    }

    #[test]
    fn test_failure_policy_resolution() {
        let failed = || Err(GenerationError::new(GenerationErrorKind::Server, "502 Bad Gateway"));

        let substituted = FailurePolicy::Substitute.resolve(failed()).unwrap();
        assert_eq!(substituted, "[ERROR] ServerError: 502 Bad Gateway");

        assert!(FailurePolicy::Abort.resolve(failed()).is_err());
        assert_eq!(FailurePolicy::Abort.resolve(Ok("fine".into())).unwrap(), "fine");
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&ChatMessage::system("be kind")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be kind"}"#);
    }
}
