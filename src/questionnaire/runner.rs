//! Questionnaire runner: one generation call per item, in item order.

use tracing::{debug, info};

use crate::gateway::{ChatMessage, FailurePolicy, TextGenerator};
use crate::error::Result;
use crate::persona::Persona;

use super::answers::AnswerSheet;
use super::types::QuestionSet;

/// Default sampling temperature for questionnaire answers.
pub const DEFAULT_ANSWER_TEMPERATURE: f32 = 0.6;

/// Asks a persona every item of a [`QuestionSet`].
pub struct QuestionnaireRunner<'a> {
    generator: &'a dyn TextGenerator,
    temperature: f32,
    failure_policy: FailurePolicy,
}

impl<'a> QuestionnaireRunner<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self {
            generator,
            temperature: DEFAULT_ANSWER_TEMPERATURE,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Build the two-message prompt for one item.
    pub fn prompt_for(persona: &Persona, questions: &QuestionSet, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(persona.system_prompt.clone()),
            ChatMessage::user(format!(
                "{}\n\n{}",
                question,
                questions.scale().answer_instruction()
            )),
        ]
    }

    /// Ask every item in order and collect the answers.
    ///
    /// Under [`FailurePolicy::Substitute`] a failed item is recorded as a
    /// sentinel answer; under [`FailurePolicy::Abort`] the first failure is
    /// returned and nothing is collected.
    pub async fn run(&self, persona: &Persona, questions: &QuestionSet) -> Result<AnswerSheet> {
        let scale = questions.scale();
        info!(persona = %persona.name, scale = %scale, items = questions.len(), "Running questionnaire");

        let mut sheet = AnswerSheet::new(scale, persona.name.clone(), self.generator.model());
        for (index, question) in questions.prompts().iter().enumerate() {
            let messages = Self::prompt_for(persona, questions, question);
            let outcome = self.generator.generate(&messages, self.temperature).await;
            let answer = self.failure_policy.resolve(outcome)?;

            debug!(persona = %persona.name, item = index + 1, chars = answer.len(), "Item answered");
            sheet.push(question.clone(), answer);
        }

        Ok(sheet)
    }
}
