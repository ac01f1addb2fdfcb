//! UI-agnostic agent runtime.
//!
//! - `agent`: the turn loop and its event channel
//! - `events`: what a turn reports, and the tool output envelope
//! - `interrupt`: Ctrl+C handling
//! - `preview`: partial text of a document tool while it streams

pub mod agent;
pub mod events;
pub mod interrupt;
pub mod preview;
