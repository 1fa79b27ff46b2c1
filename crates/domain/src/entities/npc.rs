//! NPC details supplied by the world.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{NpcId, RoomId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcInfo {
    pub id: NpcId,
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub stats: HashMap<String, f64>,
}

impl NpcInfo {
    pub fn new(id: impl Into<NpcId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            short_description: String::new(),
            room_id: None,
            flags: Vec::new(),
            stats: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = description.into();
        self
    }

    pub fn in_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    /// Case-insensitive substring match against name or short description.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&query)
            || self.short_description.to_lowercase().contains(&query)
    }
}
