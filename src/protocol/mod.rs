//! Protocol module - operations and events.
//!
//! [`Operation`] is the serializable form of every mutating engine entry
//! point; [`EngineEvent`] records each committed state change.

pub mod events;
pub mod operations;

pub use events::*;
pub use operations::*;
