//! Conversation turns, sessions and their persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::questionnaire::Scale;

use super::profile::{CounterpartKind, CounterpartProfile};

/// Which side of the conversation produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// The counterpart (therapist or friend)
    Initiator,
    /// The simulated persona
    Persona,
}

/// One utterance. `sequence_index` is its position in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub speaker_role: SpeakerRole,
    pub text: String,
    pub sequence_index: usize,
}

/// A complete or in-progress dialogue between a persona and a counterpart.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub id: Uuid,
    pub persona_name: String,
    pub counterpart: CounterpartKind,
    pub counterpart_profile: String,
    pub model: String,
    pub turn_limit: usize,
    pub scales: Vec<Scale>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    turns: Vec<ConversationTurn>,
}

impl ConversationSession {
    pub fn new(
        persona_name: impl Into<String>,
        profile: &CounterpartProfile,
        model: impl Into<String>,
        turn_limit: usize,
        scales: Vec<Scale>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            persona_name: persona_name.into(),
            counterpart: profile.kind,
            counterpart_profile: profile.description.to_string(),
            model: model.into(),
            turn_limit,
            scales,
            started_at: Utc::now(),
            finished_at: None,
            turns: Vec::with_capacity(turn_limit * 2),
        }
    }

    /// Append a turn; the index is assigned from the current length.
    pub fn push(&mut self, speaker_role: SpeakerRole, text: impl Into<String>) -> &ConversationTurn {
        let sequence_index = self.turns.len();
        self.turns.push(ConversationTurn {
            speaker_role,
            text: text.into(),
            sequence_index,
        });
        &self.turns[sequence_index]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `window` turns, oldest first.
    pub fn window(&self, window: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Speaker name written to the record for a role.
    pub fn speaker_name(&self, role: SpeakerRole) -> &str {
        match role {
            SpeakerRole::Initiator => self.counterpart.label(),
            SpeakerRole::Persona => &self.persona_name,
        }
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.id,
            persona: self.persona_name.clone(),
            counterpart: self.counterpart,
            counterpart_profile: self.counterpart_profile.clone(),
            model: self.model.clone(),
            scales: self.scales.clone(),
            turn_limit: self.turn_limit,
            started_at: self.started_at,
            finished_at: self.finished_at,
            turns: self
                .turns
                .iter()
                .map(|t| TurnRecord {
                    speaker: self.speaker_name(t.speaker_role).to_string(),
                    role: t.speaker_role,
                    text: t.text.clone(),
                })
                .collect(),
        }
    }
}

/// On-disk shape of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub persona: String,
    pub counterpart: CounterpartKind,
    pub counterpart_profile: String,
    pub model: String,
    #[serde(default)]
    pub scales: Vec<Scale>,
    pub turn_limit: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub turns: Vec<TurnRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub speaker: String,
    pub role: SpeakerRole,
    pub text: String,
}
