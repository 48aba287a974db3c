//! Structured questionnaires (PHQ-9, GAD-7, ASRM) and the runner that asks
//! a persona every item of one of them.

pub mod answers;
pub mod runner;
pub mod types;

pub use answers::{AnswerRecord, AnswerSheet};
pub use runner::QuestionnaireRunner;
pub use types::{QuestionSet, QuestionnaireItem, Scale};
