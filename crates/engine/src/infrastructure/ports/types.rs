//! Data carried across port boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taleweave_domain::ConversationState;

/// Serialized form of the active conversation table, written for crash recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub saved_at: DateTime<Utc>,
    pub conversations: Vec<ConversationState>,
}

impl ConversationSnapshot {
    pub fn new(saved_at: DateTime<Utc>, conversations: Vec<ConversationState>) -> Self {
        Self {
            saved_at,
            conversations,
        }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
