//! Player state as seen by the dialogue system.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, RoomId};

/// Progress of a quest the player knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
    Failed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub status: QuestStatus,
    #[serde(default)]
    pub progress: u32,
}

impl QuestProgress {
    pub fn active() -> Self {
        Self {
            status: QuestStatus::Active,
            progress: 0,
        }
    }
}

/// Snapshot of a player's game state.
///
/// Inventory is a repeatable list of item ids, so the count of an item is
/// the number of times its id appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub stats: HashMap<String, f64>,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub quests: HashMap<String, QuestProgress>,
    #[serde(default)]
    pub skills: HashMap<String, f64>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub currency: i64,
    #[serde(default)]
    pub faction_relations: HashMap<String, f64>,
}

impl PlayerState {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room_id: None,
            stats: HashMap::new(),
            inventory: Vec::new(),
            flags: Vec::new(),
            quests: HashMap::new(),
            skills: HashMap::new(),
            level: 1,
            currency: 0,
            faction_relations: HashMap::new(),
        }
    }

    pub fn in_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Number of times an item id appears in the inventory.
    pub fn item_count(&self, item_id: &str) -> usize {
        self.inventory.iter().filter(|i| *i == item_id).count()
    }
}
