//! Text generation gateway
//!
//! The dialogue orchestrator and the questionnaire runner only see the
//! [`TextGenerator`] trait. Concrete gateways live here: an OpenAI-compatible
//! HTTP client and a scripted in-process generator for tests and dry runs.

mod openai;
mod retry;
mod scripted;
mod traits;

pub use openai::{OpenAiConfig, OpenAiGateway, UsageTotals};
pub use retry::{retry_generation, JitterBackoff, RetryPolicy};
pub use scripted::{Fallback, RecordedCall, ScriptedGenerator};
pub use traits::*;
