//! Persona catalog: the simulated individuals whose answers and conversations
//! the pipeline generates.
//!
//! A persona is a name plus a system prompt. Names double as artifact file
//! keys, so the catalog rejects blank and duplicate names up front.

pub mod catalog;
pub mod types;

pub use catalog::PersonaCatalog;
pub use types::Persona;
