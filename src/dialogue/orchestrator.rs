//! Turn-based dialogue between a counterpart and a persona.
//!
//! Round 0 is an opener written from the background alone followed by the
//! persona's reply. Every later round picks `topics[round % len]`, asks the
//! counterpart for a line given the recent transcript, then asks the persona
//! to answer it. Calls are strictly sequential and each one only sees turns
//! produced before it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gateway::{is_sentinel, ChatMessage, FailurePolicy, TextGenerator};
use crate::persona::Persona;
use crate::questionnaire::Scale;

use super::profile::{CounterpartProfile, PERSONA_LABEL};
use super::session::{ConversationSession, ConversationTurn, SpeakerRole};
use super::topics::topic_for_round;

/// Round count and transcript window for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSettings {
    /// Rounds per session; a finished session has twice as many turns
    pub rounds: usize,
    /// Most recent turns shown to each call
    pub window: usize,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            rounds: 20,
            window: 20,
        }
    }
}

/// Runs one session at a time against an injected generator.
pub struct DialogueOrchestrator<'a> {
    generator: &'a dyn TextGenerator,
    profile: CounterpartProfile,
    settings: DialogueSettings,
    failure_policy: FailurePolicy,
}

impl<'a> DialogueOrchestrator<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        profile: CounterpartProfile,
        settings: DialogueSettings,
    ) -> Self {
        Self {
            generator,
            profile,
            settings,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn profile(&self) -> &CounterpartProfile {
        &self.profile
    }

    /// Run a full session.
    ///
    /// Under [`FailurePolicy::Abort`] the first failed generation ends the
    /// session with an error and nothing is returned to persist.
    pub async fn run(
        &self,
        persona: &Persona,
        background: &str,
        topics: &[String],
        scales: Vec<Scale>,
    ) -> Result<ConversationSession> {
        if self.settings.rounds > 1 && topics.is_empty() {
            return Err(Error::config_field_invalid(
                "topics",
                "a multi-round session needs at least one topic",
            ));
        }

        let mut session = ConversationSession::new(
            persona.name.clone(),
            &self.profile,
            self.generator.model(),
            self.settings.rounds,
            scales,
        );

        info!(
            persona = %persona.name,
            counterpart = %self.profile.kind,
            rounds = self.settings.rounds,
            session_id = %session.id,
            "Starting session"
        );

        if self.settings.rounds > 0 {
            let opener = self.opener(background).await?;
            session.push(SpeakerRole::Initiator, opener);
            let reply = self.persona_reply(persona, &session).await?;
            session.push(SpeakerRole::Persona, reply);
        }

        for round in 1..self.settings.rounds {
            let topic = topic_for_round(topics, round).unwrap_or_default();
            debug!(persona = %persona.name, round, topic, "Round");

            let line = self.counterpart_line(&session, topic).await?;
            session.push(SpeakerRole::Initiator, line);
            let reply = self.persona_reply(persona, &session).await?;
            session.push(SpeakerRole::Persona, reply);
        }

        session.finish();
        info!(
            persona = %persona.name,
            turns = session.turns().len(),
            "Session finished"
        );
        Ok(session)
    }

    async fn call(&self, messages: Vec<ChatMessage>, temperature: f32) -> Result<String> {
        let outcome = self.generator.generate(&messages, temperature).await;
        Ok(self.failure_policy.resolve(outcome)?)
    }

    async fn opener(&self, background: &str) -> Result<String> {
        self.call(
            vec![
                ChatMessage::system(self.profile.opener_system),
                ChatMessage::user(self.profile.opener_message(background)),
            ],
            self.profile.opener_temperature,
        )
        .await
    }

    async fn counterpart_line(&self, session: &ConversationSession, topic: &str) -> Result<String> {
        let transcript = render_transcript(session.window(self.settings.window), self.profile.label());
        self.call(
            vec![
                ChatMessage::system(self.profile.counterpart_system),
                ChatMessage::user(self.profile.counterpart_message(&transcript, topic)),
            ],
            self.profile.counterpart_temperature,
        )
        .await
    }

    /// Reply to the newest counterpart line that did not fail.
    async fn persona_reply(&self, persona: &Persona, session: &ConversationSession) -> Result<String> {
        let last_line = session
            .turns()
            .iter()
            .rev()
            .find(|t| t.speaker_role == SpeakerRole::Initiator && !is_sentinel(&t.text))
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        let transcript = render_transcript(session.window(self.settings.window), self.profile.label());

        self.call(
            vec![
                ChatMessage::system(self.profile.persona_system(&persona.system_prompt)),
                ChatMessage::user(self.profile.persona_message(last_line, &transcript)),
            ],
            self.profile.persona_temperature,
        )
        .await
    }
}

/// `Label: text` lines for `turns`; failed turns are left out.
pub fn render_transcript(turns: &[ConversationTurn], counterpart_label: &str) -> String {
    turns
        .iter()
        .filter(|t| !is_sentinel(&t.text))
        .map(|t| {
            let label = match t.speaker_role {
                SpeakerRole::Initiator => counterpart_label,
                SpeakerRole::Persona => PERSONA_LABEL,
            };
            format!("{}: {}", label, t.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
