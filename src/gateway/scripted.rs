//! Scripted generator for tests and dry runs
//!
//! Returns queued responses first, then falls back to a fixed behaviour.
//! Every call is recorded so tests can inspect the exact prompts sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ChatMessage, GenerationError, GenerationErrorKind, GenerationResult, TextGenerator};

/// What to return once the scripted queue is empty
#[derive(Debug, Clone)]
pub enum Fallback {
    /// `"<prefix> <n>"` where `n` is the 1-based call number
    Counter(String),
    /// The same text for every call
    Fixed(String),
    /// Fail every call with this kind
    Fail(GenerationErrorKind),
}

/// One recorded generation call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl RecordedCall {
    /// The system message, if any
    pub fn system(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == super::Role::System)
            .map(|m| m.content.as_str())
    }

    /// The last user message
    pub fn user(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == super::Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Deterministic in-process [`TextGenerator`]
pub struct ScriptedGenerator {
    model: String,
    queue: Mutex<VecDeque<GenerationResult>>,
    fallback: Fallback,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    /// Generator answering `"reply <n>"`
    pub fn new() -> Self {
        Self::with_fallback(Fallback::Counter("reply".to_string()))
    }

    /// Generator with a custom fallback behaviour
    pub fn with_fallback(fallback: Fallback) -> Self {
        Self {
            model: "scripted".to_string(),
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the model name reported in artifacts
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a response to be returned before the fallback kicks in
    pub fn push(&self, response: GenerationResult) {
        self.queue.lock().push_back(response);
    }

    /// All calls seen so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage], temperature: f32) -> GenerationResult {
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                temperature,
            });
            calls.len()
        };

        if let Some(response) = self.queue.lock().pop_front() {
            return response;
        }

        match &self.fallback {
            Fallback::Counter(prefix) => Ok(format!("{} {}", prefix, call_number)),
            Fallback::Fixed(text) => Ok(text.clone()),
            Fallback::Fail(kind) => Err(GenerationError::new(*kind, "scripted failure")),
        }
    }
}
