//! The per-turn variable context.
//!
//! Rebuilt from live sources for every provider call and never persisted.
//! Template resolution and rule evaluation both read from it; actions write
//! conversation variables and player flags into it in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::conversation::ConversationState;
use crate::entities::{NpcInfo, PlayerState, WorldState};
use crate::ids::{ConversationId, NpcId};

/// The NPC side of the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcContext {
    pub id: NpcId,
    pub name: String,
    pub flags: Vec<String>,
    pub stats: HashMap<String, f64>,
}

impl From<NpcInfo> for NpcContext {
    fn from(npc: NpcInfo) -> Self {
        Self {
            id: npc.id,
            name: npc.name,
            flags: npc.flags,
            stats: npc.stats,
        }
    }
}

/// The conversation side of the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub id: ConversationId,
    pub variables: HashMap<String, Value>,
    pub turn_count: u32,
    pub started: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<&ConversationState> for ConversationContext {
    fn from(state: &ConversationState) -> Self {
        Self {
            id: state.conversation_id.clone(),
            variables: state.variables.clone(),
            turn_count: state.turn_count,
            started: state.started,
            last_activity: state.last_activity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableContext {
    pub player: PlayerState,
    pub npc: NpcContext,
    pub conversation: ConversationContext,
    pub world: WorldState,
}

impl VariableContext {
    pub fn new(
        player: PlayerState,
        npc: NpcContext,
        conversation: ConversationContext,
        world: WorldState,
    ) -> Self {
        Self {
            player,
            npc,
            conversation,
            world,
        }
    }

    /// Walk a dotted path such as `player.stats.strength` or
    /// `conversation.variables.mood`.
    ///
    /// Returns `None` when any segment is missing or not indexable. Array
    /// elements are addressed by numeric segments (`player.inventory.0`).
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let (root, rest) = segments.split_first()?;

        let Some((field, tail)) = rest.split_first() else {
            return match *root {
                "player" => serde_json::to_value(&self.player).ok(),
                "npc" => serde_json::to_value(&self.npc).ok(),
                "conversation" => serde_json::to_value(&self.conversation).ok(),
                "world" => serde_json::to_value(&self.world).ok(),
                _ => None,
            };
        };

        let value = match *root {
            "player" => self.player_field(field)?,
            "npc" => self.npc_field(field)?,
            "conversation" => self.conversation_field(field)?,
            "world" => self.world_field(field)?,
            _ => return None,
        };

        walk(value, tail)
    }

    /// A conversation variable by name.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.conversation.variables.get(name)
    }

    fn player_field(&self, field: &str) -> Option<Value> {
        let player = &self.player;
        let value = match field {
            "id" => json!(player.id),
            "name" => json!(player.name),
            "room" | "roomId" | "room_id" => json!(player.room_id.as_ref()?),
            "stats" => json!(player.stats),
            "inventory" => json!(player.inventory),
            "flags" => json!(player.flags),
            "quests" => serde_json::to_value(&player.quests).ok()?,
            "skills" => json!(player.skills),
            "level" => json!(player.level),
            "currency" => json!(player.currency),
            "factionRelations" | "faction_relations" => json!(player.faction_relations),
            _ => return None,
        };
        Some(value)
    }

    fn npc_field(&self, field: &str) -> Option<Value> {
        let npc = &self.npc;
        let value = match field {
            "id" => json!(npc.id),
            "name" => json!(npc.name),
            "flags" => json!(npc.flags),
            "stats" => json!(npc.stats),
            _ => return None,
        };
        Some(value)
    }

    fn conversation_field(&self, field: &str) -> Option<Value> {
        let conversation = &self.conversation;
        let value = match field {
            "id" => json!(conversation.id),
            "variables" => json!(conversation.variables),
            "turnCount" | "turn_count" => json!(conversation.turn_count),
            "started" => json!(conversation.started),
            "lastActivity" | "last_activity" => json!(conversation.last_activity),
            _ => return None,
        };
        Some(value)
    }

    fn world_field(&self, field: &str) -> Option<Value> {
        let world = &self.world;
        let value = match field {
            "time" => json!(world.time),
            "globalFlags" | "global_flags" => json!(world.global_flags),
            "factionRelations" | "faction_relations" => json!(world.faction_relations),
            _ => return None,
        };
        Some(value)
    }
}

fn walk(mut value: Value, segments: &[&str]) -> Option<Value> {
    for segment in segments {
        value = match value {
            Value::Object(mut map) => map.remove(*segment)?,
            Value::Array(mut items) => {
                let index: usize = segment.parse().ok()?;
                if index >= items.len() {
                    return None;
                }
                items.swap_remove(index)
            }
            _ => return None,
        };
    }
    Some(value)
}
