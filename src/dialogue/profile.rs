//! Counterpart roles and the prompts each one uses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who talks to the persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartKind {
    /// Warm licensed therapist screening casually
    Therapist,
    /// Caring close friend, not clinical
    Friend,
}

impl CounterpartKind {
    pub fn slug(&self) -> &'static str {
        match self {
            CounterpartKind::Therapist => "therapist",
            CounterpartKind::Friend => "friend",
        }
    }

    /// Speaker label used in transcripts and session records.
    pub fn label(&self) -> &'static str {
        match self {
            CounterpartKind::Therapist => "Therapist",
            CounterpartKind::Friend => "Friend",
        }
    }

    pub fn profile(&self) -> CounterpartProfile {
        match self {
            CounterpartKind::Therapist => CounterpartProfile::therapist(),
            CounterpartKind::Friend => CounterpartProfile::friend(),
        }
    }
}

impl fmt::Display for CounterpartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CounterpartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "therapist" | "clinician" => Ok(CounterpartKind::Therapist),
            "friend" => Ok(CounterpartKind::Friend),
            _ => Err(format!(
                "Unknown counterpart: '{}'. Valid counterparts: therapist, friend",
                s
            )),
        }
    }
}

/// Label for persona lines inside rendered transcripts.
pub const PERSONA_LABEL: &str = "Persona";

/// Prompts and sampling settings for one counterpart role.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterpartProfile {
    pub kind: CounterpartKind,

    /// One-line description stored with every session
    pub description: &'static str,

    /// System prompt for the opening line
    pub opener_system: &'static str,

    /// Instruction appended after the background for the opening line
    pub opener_instruction: Option<&'static str>,

    /// System prompt for every later counterpart line
    pub counterpart_system: &'static str,

    /// Appended to the persona's own system prompt for conversational replies
    pub persona_reply_style: &'static str,

    pub opener_temperature: f32,
    pub counterpart_temperature: f32,
    pub persona_temperature: f32,
}

impl CounterpartProfile {
    pub fn therapist() -> Self {
        Self {
            kind: CounterpartKind::Therapist,
            description: "Warm, empathetic therapist screening casually for symptoms.",
            opener_system: "You are a warm, empathetic licensed therapist. \
                Use the provided intake background to personalize your next question. \
                1-2 sentences, casual tone, end with a gentle question. \
                Do not mention questionnaires, scales or 'intake forms' explicitly.",
            opener_instruction: Some("Start with a gentle opener referencing something minor from above."),
            counterpart_system: "You are a warm, empathetic licensed therapist. \
                Your goal is to gently understand how the client has been feeling \
                in a natural conversation. Speak in a casual, human tone, 1-2 sentences max. \
                Do NOT mention any questionnaire or scale by name. \
                Ask one clear question at a time, validate feelings, and avoid clinical jargon or diagnoses. \
                If immediate risk is indicated, respond with care and encourage urgent support, concisely.",
            persona_reply_style: "Reply as yourself in a natural, conversational tone (1-3 short sentences). \
                Be honest and human. Avoid overly long paragraphs.",
            opener_temperature: 0.65,
            counterpart_temperature: 0.7,
            persona_temperature: 0.8,
        }
    }

    pub fn friend() -> Self {
        Self {
            kind: CounterpartKind::Friend,
            description: "Caring, supportive close friend (not clinical).",
            opener_system: "You are a caring close friend. Using the background, open the chat in 1-2 warm sentences. \
                Acknowledge they've been going through some things, but DO NOT mention questionnaires or tests.",
            opener_instruction: None,
            counterpart_system: "You are a caring, emotionally intelligent close friend (not a clinician). \
                You speak in a warm, natural tone, 1-2 short sentences. \
                You never mention questionnaires, tests, or scales. \
                You gently explore how your friend is doing (mood, anxiety, energy, sleep, thoughts, behavior) \
                based on what they said earlier.",
            persona_reply_style: "Reply as yourself to your close friend in 1-3 short, natural sentences. \
                Be consistent with your personality and previous answers.",
            opener_temperature: 0.7,
            counterpart_temperature: 0.8,
            persona_temperature: 0.8,
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// User message for the opening line.
    pub fn opener_message(&self, background: &str) -> String {
        match self.opener_instruction {
            Some(instruction) => format!("{}\n\n{}", background, instruction),
            None => background.to_string(),
        }
    }

    /// User message for a counterpart line in round >= 1.
    pub fn counterpart_message(&self, transcript: &str, topic: &str) -> String {
        match self.kind {
            CounterpartKind::Therapist => format!(
                "Recent conversation (last turns):\n\n{}\n\n\
                 Your next prompt topic to weave in naturally: {}\n\n\
                 Respond as the Therapist. Keep it to 1-2 short sentences and end with a gentle question.",
                transcript, topic
            ),
            CounterpartKind::Friend => format!(
                "Recent chat:\n{}\n\n\
                 Next subtle topic to explore: {}\n\
                 Respond as the Friend. End with a simple, open question.",
                transcript, topic
            ),
        }
    }

    /// System prompt for a persona reply.
    pub fn persona_system(&self, persona_prompt: &str) -> String {
        format!("{}\n\n{}", persona_prompt, self.persona_reply_style)
    }

    /// User message for a persona reply to `counterpart_line`.
    pub fn persona_message(&self, counterpart_line: &str, transcript: &str) -> String {
        match self.kind {
            CounterpartKind::Therapist => format!(
                "The therapist just said: {}\n\n\
                 Recent context:\n{}\n\n\
                 Please reply as the Persona in 1-3 short sentences.",
                counterpart_line, transcript
            ),
            CounterpartKind::Friend => format!(
                "Your friend just said:\n{}\n\n\
                 Recent context:\n{}\n\n\
                 Now reply as the character.",
                counterpart_line, transcript
            ),
        }
    }
}
