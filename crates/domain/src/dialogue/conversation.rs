//! Conversation state and turn responses.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::DialogueAction;
use crate::ids::{ConversationId, NpcId, PlayerId, TreeId};

/// The family of conversation strategy a provider implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Scripted dialogue trees.
    Canned,
    /// Generative agents.
    Ai,
    Custom,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canned => write!(f, "canned"),
            Self::Ai => write!(f, "ai"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// One ongoing exchange between a player, an NPC and a provider.
///
/// `player_id` is fixed at creation; there is no setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub conversation_id: ConversationId,
    player_id: PlayerId,
    pub npc_id: NpcId,
    pub provider_id: String,
    /// Set by tree-backed providers.
    #[serde(default)]
    pub tree_id: Option<TreeId>,
    pub current_node_id: String,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub flags: Vec<String>,
    pub started: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub turn_count: u32,
    pub is_active: bool,
}

impl ConversationState {
    pub fn new(
        conversation_id: ConversationId,
        player_id: PlayerId,
        npc_id: NpcId,
        provider_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            conversation_id,
            player_id,
            npc_id,
            provider_id: provider_id.into(),
            tree_id: None,
            current_node_id: String::new(),
            variables: HashMap::new(),
            flags: Vec::new(),
            started: now,
            last_activity: now,
            turn_count: 0,
            is_active: true,
        }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn is_owned_by(&self, player_id: &PlayerId) -> bool {
        &self.player_id == player_id
    }

    /// Record activity for a player turn.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.turn_count += 1;
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity
    }

    /// Whether the conversation has been idle for longer than `timeout_minutes`.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout_minutes: u64) -> bool {
        let limit_ms = i64::try_from(timeout_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(60_000);
        self.idle_for(now).num_milliseconds() > limit_ms
    }

    pub fn close(&mut self) {
        self.is_active = false;
    }
}

/// A choice as presented to the player: resolved text, condition already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseChoice {
    pub id: String,
    pub text: String,
}

/// What a provider returns for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueResponse {
    pub conversation_id: ConversationId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ResponseChoice>>,
    pub is_complete: bool,
    /// State after this turn; the manager stores it.
    pub state: ConversationState,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Actions executed during this turn.
    #[serde(default)]
    pub actions: Vec<DialogueAction>,
}

impl DialogueResponse {
    pub fn has_choices(&self) -> bool {
        self.choices.as_ref().is_some_and(|c| !c.is_empty())
    }
}
