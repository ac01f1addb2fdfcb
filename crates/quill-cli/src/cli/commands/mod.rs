//! CLI command handlers.

pub mod chat;
pub mod config;
pub mod document;
pub mod exec;
pub mod render;
