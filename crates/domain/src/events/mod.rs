//! Domain Events
//!
//! Observability events emitted by the dialogue system. Each event carries
//! the conversation and player it concerns plus a structured payload; the
//! engine hands them to an event sink at the adapter boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ConversationId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueEventKind {
    #[serde(rename = "conversation.started")]
    ConversationStarted,
    #[serde(rename = "conversation.continued")]
    ConversationContinued,
    #[serde(rename = "conversation.ended")]
    ConversationEnded,
    #[serde(rename = "dialogue.node.reached")]
    NodeReached,
    #[serde(rename = "dialogue.choice.made")]
    ChoiceMade,
    #[serde(rename = "dialogue.action.executed")]
    ActionExecuted,
}

impl DialogueEventKind {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConversationStarted => "conversation.started",
            Self::ConversationContinued => "conversation.continued",
            Self::ConversationEnded => "conversation.ended",
            Self::NodeReached => "dialogue.node.reached",
            Self::ChoiceMade => "dialogue.choice.made",
            Self::ActionExecuted => "dialogue.action.executed",
        }
    }
}

/// Domain event for significant conversation state changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueEvent {
    pub kind: DialogueEventKind,
    pub conversation_id: ConversationId,
    pub player_id: PlayerId,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl DialogueEvent {
    pub fn new(
        kind: DialogueEventKind,
        conversation_id: ConversationId,
        player_id: PlayerId,
        payload: Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            conversation_id,
            player_id,
            payload,
            occurred_at,
        }
    }
}
