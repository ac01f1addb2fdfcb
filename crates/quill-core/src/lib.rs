//! Core Quill library: the document model, the agent loop, the chat
//! provider, document tools and configuration.

pub mod artifact;
pub mod config;
pub mod conversation;
pub mod core;
pub mod document;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod tools;
