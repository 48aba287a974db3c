//! Multi-turn conversations between a persona and a counterpart role,
//! seeded with the persona's earlier questionnaire answers.

pub mod background;
pub mod orchestrator;
pub mod profile;
pub mod session;
pub mod topics;

pub use background::build_background;
pub use orchestrator::{render_transcript, DialogueOrchestrator, DialogueSettings};
pub use profile::{CounterpartKind, CounterpartProfile};
pub use session::{ConversationSession, ConversationTurn, SessionRecord, SpeakerRole, TurnRecord};
