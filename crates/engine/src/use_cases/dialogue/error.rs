//! Dialogue error types.

use taleweave_domain::{ConversationId, DomainError};

use crate::infrastructure::ports::PortError;

/// Errors raised to callers of the dialogue manager and providers.
///
/// Rule failures inside conditions and actions never surface here; they
/// are resolved to `false` or a no-op where they happen.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// Malformed content or a tree that cannot be traversed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("Conversation {conversation_id} belongs to another player")]
    Ownership { conversation_id: ConversationId },

    #[error("Too many active conversations ({current}/{max})")]
    Capacity { current: usize, max: usize },

    #[error("Conversation {conversation_id} timed out after {idle_minutes} idle minutes")]
    Timeout {
        conversation_id: ConversationId,
        idle_minutes: u64,
    },

    /// A collaborator needed to build the turn context failed.
    #[error("Collaborator error: {0}")]
    Port(#[from] PortError),
}

impl DialogueError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<DomainError> for DialogueError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            DomainError::Validation(msg) => Self::Configuration(msg),
        }
    }
}
