//! Error sanitization for player-facing messages.
//!
//! Prevents leaking internal details (paths, ids, collaborator errors) to
//! players. Every message is one short sentence.

use crate::use_cases::dialogue::DialogueError;

/// Sanitize an error for player consumption.
///
/// Logs the full error server-side, returns a generic message.
pub fn sanitize_error<E: std::fmt::Display>(error: &E, context: &str) -> String {
    tracing::error!(
        error = %error,
        context = context,
        "Internal error occurred"
    );

    messages::INTERNAL_ERROR.to_string()
}

/// Map a dialogue error to the sentence shown to the player.
pub fn dialogue_error_message(error: &DialogueError, context: &str) -> String {
    match error {
        DialogueError::NotFound { entity_type, .. } if *entity_type == "conversation" => {
            messages::NO_CONVERSATION.to_string()
        }
        DialogueError::NotFound { .. } => messages::NOT_FOUND.to_string(),
        DialogueError::Ownership { .. } => messages::NOT_YOURS.to_string(),
        DialogueError::Capacity { max, .. } => {
            format!("You are already in too many conversations (limit {max}).")
        }
        DialogueError::Timeout { .. } => messages::TIMED_OUT.to_string(),
        DialogueError::Configuration(_) | DialogueError::Port(_) => sanitize_error(error, context),
    }
}

/// Common messages for player consumption.
pub mod messages {
    pub const INTERNAL_ERROR: &str = "Something went wrong. Please try again.";
    pub const NOT_FOUND: &str = "Nothing answers.";
    pub const NO_CONVERSATION: &str = "You are not in that conversation.";
    pub const NOT_YOURS: &str = "That is not your conversation.";
    pub const TIMED_OUT: &str = "The conversation has lapsed into silence.";
}
