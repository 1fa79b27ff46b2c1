//! API layer - player command entry points.

pub mod commands;
pub mod error_sanitizer;

pub use commands::{CommandHandler, CommandRegistry, DialogueCommands, CONVERSATION_ENDED};
