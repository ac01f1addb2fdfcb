//! Helpers shared across TUI features.

pub mod commands;
mod text;

pub use commands::{COMMANDS, Command, find_command};
pub use text::{sanitize_for_display, truncate_with_ellipsis};
